//! 仿真器
//!
//! 定义事件驱动仿真器，维护当前时间与事件队列。
//! 协议栈里的定时器（RTO、延迟 ACK 等）通过 `schedule` 返回的
//! `EventId` 句柄取消：取消一个尚未触发的事件是常规且安全的操作，
//! 事件的唯一所有权在仿真器手里，不存在悬空回调。

use super::event::Event;
use super::scheduled_event::{EventId, ScheduledEvent};
use super::time::SimTime;
use super::world::World;
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, info, trace};

/// 事件驱动仿真器：维护当前时间与事件队列。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
    cancelled: HashSet<u64>,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 调度事件在指定时间执行，返回可取消的句柄。
    #[tracing::instrument(skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) -> EventId {
        let seq = self.next_seq;
        trace!(now = ?self.now, seq, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(ScheduledEvent {
            at,
            seq,
            ev: Box::new(ev),
        });

        debug!(queue_size = self.q.len(), "事件已加入队列");
        EventId(seq)
    }

    /// 从当前时间延迟 `delay` 调度事件。
    pub fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) -> EventId {
        self.schedule(self.now.saturating_add(delay), ev)
    }

    /// 取消一个尚未执行的事件。对已执行或未知的句柄是 no-op。
    pub fn cancel(&mut self, id: EventId) {
        trace!(seq = id.0, "取消事件");
        self.cancelled.insert(id.0);
    }

    fn take_next(&mut self, until: Option<SimTime>) -> Option<ScheduledEvent> {
        while let Some(top) = self.q.peek() {
            if let Some(limit) = until {
                if top.at > limit {
                    return None;
                }
            }
            let item = self.q.pop().expect("peek then pop");
            if self.cancelled.remove(&item.seq) {
                trace!(seq = item.seq, "跳过已取消的事件");
                continue;
            }
            return Some(item);
        }
        None
    }

    /// 运行直到事件队列为空或到达 `until`。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        while let Some(item) = self.take_next(Some(until)) {
            self.now = item.at;
            item.ev.execute(self, world);
            world.on_tick(self);
        }
        self.now = self.now.max(until);
    }

    /// 运行所有事件直到队列为空。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.q.len(), "初始状态");

        let mut event_count = 0;
        while let Some(item) = self.take_next(None) {
            event_count += 1;
            self.now = item.at;

            debug!(
                event_num = event_count,
                now = ?self.now,
                scheduled_at = ?item.at,
                seq = item.seq,
                remaining_queue = self.q.len(),
                "执行事件"
            );

            item.ev.execute(self, world);
            world.on_tick(self);
        }

        info!(
            total_events = event_count,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
    }
}
