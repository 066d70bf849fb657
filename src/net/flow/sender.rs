//! TCP Reno and FAST TCP sender state machines (spec §4.5, §4.6), plus the
//! fixed-window baseline senders supplemented from
//! `original_source/icfire/flow.py::SuperSimpleFlow`.

use crate::net::ids::{FlowId, NodeId};
use crate::net::packet::Packet;
use crate::sim::time::SimTime;
use crate::stats::{Sample, StatsSink};
use std::collections::BTreeMap;

const RENO_INITIAL_SSTHRESH: f64 = 1000.0;
const INITIAL_SRTT_MS: f64 = 3000.0;
const MIN_RTO_MS: f64 = 1000.0;
const MAX_RTO_MS: f64 = 60000.0;
const RTO_BETA: f64 = 1.5;
const RTT_ALPHA: f64 = 0.9;
const FAST_WINDOW_BETA: f64 = 0.9;
const FAST_ALPHA: f64 = 20.0;

#[derive(Debug, Clone, Copy)]
struct Inflight {
    send_time: SimTime,
    repeated: bool,
}

#[derive(Debug, Clone, Default)]
struct RenoState {
    ssthresh: f64,
    ca_num: u32,
    fast_recovery: bool,
    max_wnd: f64,
    expected_ack: u64,
}

#[derive(Debug, Clone, Default)]
struct FastState {
    brtt: f64,
    cwnd_double: f64,
    bootstrap: bool,
    fast_recovery: bool,
    max_wnd: f64,
    expected_ack: u64,
}

#[derive(Debug, Clone)]
pub enum SenderVariant {
    Reno(RenoState),
    Fast(FastState),
    SimpleWindow { window: u64 },
}

impl SenderVariant {
    pub fn reno() -> Self {
        SenderVariant::Reno(RenoState {
            ssthresh: RENO_INITIAL_SSTHRESH,
            ca_num: 0,
            fast_recovery: false,
            max_wnd: 0.0,
            expected_ack: 0,
        })
    }

    pub fn fast() -> Self {
        SenderVariant::Fast(FastState {
            brtt: f64::INFINITY,
            cwnd_double: 1.0,
            bootstrap: true,
            fast_recovery: false,
            max_wnd: 0.0,
            expected_ack: 0,
        })
    }

    pub fn simple_window(window: u64) -> Self {
        SenderVariant::SimpleWindow { window }
    }

    pub fn is_fast(&self) -> bool {
        matches!(self, SenderVariant::Fast(_))
    }
}

/// TCP-like flow sender. Owned exclusively by the source `Host` (spec §3).
#[derive(Debug, Clone)]
pub struct FlowSender {
    pub id: FlowId,
    pub source: NodeId,
    pub dest: NodeId,
    pub byte_budget: u64,
    pub final_index: u64,

    pub last_ack: u64,
    pub num_last_ack: u32,
    pub next_send: u64,
    pub last_rep_sent: u64,
    pub cwnd: f64,
    pub srtt: f64,
    pub rto: f64,
    pub next_timeout: SimTime,
    pub active: bool,
    pub ignore_until: SimTime,
    pub done: bool,

    inflight: BTreeMap<u64, Inflight>,
    variant: SenderVariant,
}

impl FlowSender {
    pub fn new(
        id: FlowId,
        source: NodeId,
        dest: NodeId,
        byte_budget: u64,
        variant: SenderVariant,
    ) -> Self {
        let final_index = if byte_budget == 0 {
            u64::MAX
        } else {
            byte_budget.div_ceil(1024)
        };
        let cwnd = match &variant {
            SenderVariant::SimpleWindow { window } => *window as f64,
            _ => 1.0,
        };
        FlowSender {
            id,
            source,
            dest,
            byte_budget,
            final_index,
            last_ack: 0,
            num_last_ack: 0,
            next_send: 0,
            last_rep_sent: 0,
            cwnd,
            srtt: INITIAL_SRTT_MS,
            rto: MAX_RTO_MS,
            next_timeout: SimTime(f64::NEG_INFINITY),
            active: false,
            ignore_until: SimTime(f64::NEG_INFINITY),
            done: false,
            inflight: BTreeMap::new(),
            variant,
        }
    }

    pub fn is_fast(&self) -> bool {
        self.variant.is_fast()
    }

    /// spec §4.5 step 2/3, specialized per §4.6 for FAST.
    pub fn on_ack(&mut self, pkt: &Packet, t: SimTime, stats: &mut dyn StatsSink) -> Vec<Packet> {
        self.active = true;
        let ack_index = pkt.index.expect("ack carries an index");
        let mut packets = Vec::new();

        if ack_index == self.last_ack && t > self.ignore_until {
            self.num_last_ack += 1;
            self.on_duplicate_ack(t, &mut packets);
        } else if ack_index > self.last_ack {
            self.sample_rtt(pkt, ack_index, t, stats);
            self.advance_cumulative_ack(ack_index);
            self.on_new_ack_growth(ack_index, t);
        }

        stats.record(Sample::window(self.id.clone(), t, self.displayed_window()));
        packets.extend(self.send_packets(t, stats));
        packets
    }

    fn displayed_window(&self) -> f64 {
        match &self.variant {
            SenderVariant::Reno(r) if r.fast_recovery => r.ssthresh,
            _ => self.cwnd,
        }
    }

    fn on_duplicate_ack(&mut self, t: SimTime, packets: &mut Vec<Packet>) {
        if self.num_last_ack == 4 {
            let retransmit_idx = self.last_ack;
            match &mut self.variant {
                SenderVariant::Reno(r) => {
                    r.ssthresh = (self.cwnd / 2.0).max(2.0);
                    self.cwnd = r.ssthresh + 3.0;
                    r.ca_num = 0;
                    r.fast_recovery = true;
                    r.expected_ack = self.next_send;
                    r.max_wnd = self.cwnd * 2.0;
                }
                SenderVariant::Fast(f) => {
                    // No ssthresh halving: FAST's cwnd is governed solely by
                    // the periodic WindowUpdate formula (spec §4.6).
                    f.fast_recovery = true;
                    f.expected_ack = self.next_send;
                    f.max_wnd = self.cwnd * 2.0;
                }
                SenderVariant::SimpleWindow { .. } => return,
            }
            self.last_rep_sent = self.last_rep_sent.max(self.next_send);
            packets.push(self.build_retransmit(retransmit_idx, t));
        } else {
            enum Action {
                None,
                Timeout,
                Inflate,
            }
            let action = match &self.variant {
                SenderVariant::Reno(r) => {
                    if r.fast_recovery && (self.num_last_ack as f64) > r.max_wnd {
                        Action::Timeout
                    } else if self.num_last_ack > 4 {
                        Action::Inflate
                    } else {
                        Action::None
                    }
                }
                SenderVariant::Fast(f) => {
                    if f.fast_recovery && (self.num_last_ack as f64) > f.max_wnd {
                        Action::Timeout
                    } else {
                        Action::None
                    }
                }
                SenderVariant::SimpleWindow { .. } => Action::None,
            };
            match action {
                Action::Timeout => self.timeout(t),
                Action::Inflate => {
                    self.cwnd += 1.0;
                    if let SenderVariant::Reno(r) = &mut self.variant {
                        r.ca_num = 0;
                    }
                }
                Action::None => {}
            }
        }
    }

    fn sample_rtt(&mut self, pkt: &Packet, ack_index: u64, t: SimTime, stats: &mut dyn StatsSink) {
        match &mut self.variant {
            SenderVariant::Fast(f) => {
                let Some(send_ts) = pkt.send_timestamp else {
                    return;
                };
                let rtt = t.as_millis() - send_ts.as_millis();
                if f.bootstrap {
                    self.srtt = rtt;
                    f.bootstrap = false;
                } else {
                    let a = (3.0 / self.cwnd).min(0.25);
                    self.srtt = (1.0 - a) * self.srtt + a * rtt;
                }
                f.brtt = f.brtt.min(self.srtt);
                stats.record(Sample::rtt(self.id.clone(), t, rtt));
            }
            _ => {
                let Some(prev_idx) = ack_index.checked_sub(1) else {
                    return;
                };
                if prev_idx <= self.last_rep_sent {
                    return;
                }
                let Some(seg) = self.inflight.get(&prev_idx) else {
                    return;
                };
                if seg.repeated {
                    return;
                }
                let rtt = t.as_millis() - seg.send_time.as_millis();
                self.srtt = RTT_ALPHA * self.srtt + (1.0 - RTT_ALPHA) * rtt;
                stats.record(Sample::rtt(self.id.clone(), t, rtt));
            }
        }
    }

    fn advance_cumulative_ack(&mut self, ack_index: u64) {
        let stale: Vec<u64> = self
            .inflight
            .range(self.last_ack..ack_index)
            .map(|(&idx, _)| idx)
            .collect();
        for idx in stale {
            self.inflight.remove(&idx);
        }
        self.last_ack = ack_index;
        self.next_send = self.next_send.max(self.last_ack);
        self.num_last_ack = 1;
        if self.last_ack == self.final_index {
            self.done = true;
        }
    }

    fn on_new_ack_growth(&mut self, ack_index: u64, t: SimTime) {
        // Computed first and acted on after the match so that `self.timeout`
        // (which needs the whole `&mut self`) never runs while a variant
        // borrow is still live.
        enum Action {
            None,
            ExitFastRecoveryRenoStyle,
            RenoGrowth,
            ExitFastRecoveryFastStyle,
            MissedRecoveryAck,
        }

        let action = match &mut self.variant {
            SenderVariant::Reno(r) => {
                if r.fast_recovery && ack_index < r.expected_ack {
                    Action::MissedRecoveryAck
                } else if r.fast_recovery {
                    Action::ExitFastRecoveryRenoStyle
                } else {
                    Action::RenoGrowth
                }
            }
            SenderVariant::Fast(f) => {
                if f.fast_recovery && ack_index < f.expected_ack {
                    Action::MissedRecoveryAck
                } else if f.fast_recovery {
                    Action::ExitFastRecoveryFastStyle
                } else {
                    Action::None
                }
            }
            SenderVariant::SimpleWindow { .. } => Action::None,
        };

        match action {
            Action::MissedRecoveryAck => {
                self.ignore_until = SimTime(t.as_millis() + 1000.0);
                self.timeout(t);
                self.reno_growth();
            }
            Action::ExitFastRecoveryRenoStyle => {
                if let SenderVariant::Reno(r) = &mut self.variant {
                    self.cwnd = r.ssthresh;
                    r.ca_num = 0;
                    r.fast_recovery = false;
                }
                self.reno_growth();
            }
            Action::RenoGrowth => self.reno_growth(),
            Action::ExitFastRecoveryFastStyle => {
                if let SenderVariant::Fast(f) = &mut self.variant {
                    f.fast_recovery = false;
                }
            }
            Action::None => {}
        }
    }

    /// spec §4.5 step 3, slow start / congestion avoidance. Reno only.
    fn reno_growth(&mut self) {
        let SenderVariant::Reno(r) = &mut self.variant else {
            return;
        };
        if self.cwnd < r.ssthresh {
            self.cwnd += 1.0;
        } else {
            r.ca_num += 1;
            if (r.ca_num as f64) == self.cwnd {
                self.cwnd += 1.0;
                r.ca_num = 0;
            }
        }
    }

    fn build_retransmit(&mut self, idx: u64, t: SimTime) -> Packet {
        let send_ts = if self.is_fast() { Some(t) } else { None };
        self.inflight.insert(
            idx,
            Inflight {
                send_time: t,
                repeated: true,
            },
        );
        Packet::data(self.source, self.dest, self.id.clone(), idx, send_ts)
    }

    /// spec §4.5 `sendPackets`.
    fn send_packets(&mut self, t: SimTime, stats: &mut dyn StatsSink) -> Vec<Packet> {
        let window = self.cwnd.max(0.0).floor() as u64;
        let upper = self.final_index.min(self.last_ack + window);
        let mut packets = Vec::new();
        let mut bytes = 0u64;
        let send_ts = if self.is_fast() { Some(t) } else { None };
        while self.next_send < upper {
            let idx = self.next_send;
            let repeated = self.inflight.contains_key(&idx);
            let pkt = Packet::data(self.source, self.dest, self.id.clone(), idx, send_ts);
            bytes += pkt.size as u64;
            self.inflight.insert(
                idx,
                Inflight {
                    send_time: t,
                    repeated,
                },
            );
            packets.push(pkt);
            self.next_send += 1;
        }
        self.next_send = self.next_send.max(upper);
        if bytes > 0 {
            stats.record(Sample::bytes_sent(self.id.clone(), t, bytes as f64));
        }
        packets
    }

    /// spec §4.5 `timeout`.
    fn timeout(&mut self, t: SimTime) {
        if self.done || t <= self.next_timeout {
            return;
        }
        self.cwnd = 1.0;
        match &mut self.variant {
            SenderVariant::Reno(r) => {
                r.ca_num = 0;
                r.fast_recovery = false;
            }
            SenderVariant::Fast(f) => {
                f.fast_recovery = false;
            }
            SenderVariant::SimpleWindow { .. } => {}
        }
        self.last_rep_sent = self.last_rep_sent.max(self.next_send);
        self.next_send = self.last_ack;
        self.next_timeout = SimTime(t.as_millis() + 2.0 * self.srtt);
    }

    /// spec §4.5 `onTimerTick`, driven by `Host`'s `FlowUpdate` handler.
    pub fn on_timer_tick(&mut self, t: SimTime, stats: &mut dyn StatsSink) -> (Vec<Packet>, f64) {
        if !self.active {
            self.timeout(t);
        }
        self.rto = (RTO_BETA * self.srtt).clamp(MIN_RTO_MS, MAX_RTO_MS);
        self.active = false;
        let packets = self.send_packets(t, stats);
        (packets, self.rto)
    }

    /// spec §4.6 periodic `WindowUpdate`, FAST only. No-op for other
    /// variants (their cwnd doesn't evolve on a timer).
    pub fn on_window_update(&mut self, t: SimTime, stats: &mut dyn StatsSink) {
        if let SenderVariant::Fast(f) = &mut self.variant {
            let a = FAST_WINDOW_BETA;
            f.cwnd_double =
                (1.0 - a) * f.cwnd_double + a * ((f.brtt / self.srtt) * self.cwnd + FAST_ALPHA);
            self.cwnd = f.cwnd_double.floor();
            stats.record(Sample::window(self.id.clone(), t, self.cwnd));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::VecSink;

    fn flow_id() -> FlowId {
        FlowId::from("f1")
    }

    #[test]
    fn reno_slow_start_doubles_each_round_without_loss() {
        let mut sender = FlowSender::new(flow_id(), NodeId(0), NodeId(1), 1_000_000, SenderVariant::reno());
        let mut sink = VecSink::default();
        sender.on_timer_tick(SimTime::ZERO, &mut sink);
        assert_eq!(sender.next_send, 1);

        for k in 1..5u64 {
            let ack = Packet::ack(NodeId(1), NodeId(0), flow_id(), k, None);
            sender.on_ack(&ack, SimTime::millis(10.0 * k as f64), &mut sink);
            assert_eq!(sender.cwnd, 1.0 + k as f64);
        }
    }

    #[test]
    fn triple_dup_ack_halves_ssthresh_and_enters_fast_recovery() {
        let mut sender = FlowSender::new(flow_id(), NodeId(0), NodeId(1), 1_000_000, SenderVariant::reno());
        let mut sink = VecSink::default();
        sender.on_timer_tick(SimTime::ZERO, &mut sink);
        sender.cwnd = 8.0;

        let dup = Packet::ack(NodeId(1), NodeId(0), flow_id(), 0, None);
        for i in 1..=4u32 {
            let out = sender.on_ack(&dup, SimTime::millis(i as f64), &mut sink);
            if i == 4 {
                assert!(out.iter().any(|p| p.index == Some(0)));
            }
        }
        match &sender_variant(&sender) {
            SenderVariant::Reno(r) => {
                assert!(r.fast_recovery);
                assert_eq!(r.ssthresh, 4.0);
            }
            _ => unreachable!(),
        }
    }

    fn sender_variant(s: &FlowSender) -> SenderVariant {
        s.variant.clone()
    }

    #[test]
    fn simple_window_n_keeps_n_packets_in_flight() {
        let mut sender = FlowSender::new(
            flow_id(),
            NodeId(0),
            NodeId(1),
            1_000_000,
            SenderVariant::simple_window(4),
        );
        let mut sink = VecSink::default();
        let (packets, _) = sender.on_timer_tick(SimTime::ZERO, &mut sink);
        assert_eq!(packets.len(), 4);
        assert_eq!(sender.next_send, 4);
    }

    #[test]
    fn zero_bytes_is_an_unbounded_flow() {
        let sender = FlowSender::new(flow_id(), NodeId(0), NodeId(1), 0, SenderVariant::reno());
        assert_eq!(sender.final_index, u64::MAX);
    }

    #[test]
    fn flow_completes_when_last_ack_reaches_final_index() {
        let mut sender = FlowSender::new(
            flow_id(),
            NodeId(0),
            NodeId(1),
            2048,
            SenderVariant::simple_window(4),
        );
        let mut sink = VecSink::default();
        sender.on_timer_tick(SimTime::ZERO, &mut sink);
        let ack = Packet::ack(NodeId(1), NodeId(0), flow_id(), 2, None);
        sender.on_ack(&ack, SimTime::millis(5.0), &mut sink);
        assert!(sender.done);
    }
}
