/// 最新帧槽位 (latest-frame-wins)
/// Single shared slot between a decoder thread and the painter
///
/// 解码线程覆盖写入, 渲染线程每帧读取; 不排队, 渲染跟不上时旧帧被丢弃。
use crate::frame::VideoFrame;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct SlotState {
    frame: Option<VideoFrame>,
    consumed: bool,
    next_sequence: u64,
    published: u64,
    dropped: u64,
}

/// 槽位统计
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotStats {
    pub published: u64,
    pub dropped: u64,
    pub frame_size: Option<(u32, u32)>,
}

#[derive(Clone, Default)]
pub struct FrameSlot {
    inner: Arc<Mutex<SlotState>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // 生产者panic不影响显示最后一帧
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 写入最新帧, 返回分配的序号
    pub fn publish(&self, mut frame: VideoFrame) -> u64 {
        let mut state = self.lock();
        state.next_sequence += 1;
        frame.sequence = state.next_sequence;

        if state.frame.is_some() && !state.consumed {
            state.dropped += 1;
        }
        state.frame = Some(frame);
        state.consumed = false;
        state.published += 1;
        state.next_sequence
    }

    /// 取比 `seen` 更新的帧; 没有新帧时返回 None
    pub fn latest_since(&self, seen: u64) -> Option<VideoFrame> {
        let mut state = self.lock();
        let frame = state.frame.as_ref().filter(|f| f.sequence > seen)?.clone();
        state.consumed = true;
        Some(frame)
    }

    /// 当前帧 (不改变消费状态)
    pub fn snapshot(&self) -> Option<VideoFrame> {
        self.lock().frame.clone()
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.frame = None;
        state.consumed = false;
    }

    pub fn stats(&self) -> SlotStats {
        let state = self.lock();
        SlotStats {
            published: state.published,
            dropped: state.dropped,
            frame_size: state.frame.as_ref().map(VideoFrame::size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, value: u8) -> VideoFrame {
        VideoFrame::from_rgba(width, height, vec![value; (width * height * 4) as usize]).unwrap()
    }

    #[test]
    fn empty_slot_has_nothing() {
        let slot = FrameSlot::new();
        assert!(slot.latest_since(0).is_none());
        assert!(slot.snapshot().is_none());
        assert_eq!(slot.stats(), SlotStats::default());
    }

    #[test]
    fn newest_frame_wins() {
        let slot = FrameSlot::new();
        slot.publish(solid(2, 2, 1));
        slot.publish(solid(2, 2, 2));
        let last = slot.publish(solid(4, 4, 3));

        let frame = slot.latest_since(0).unwrap();
        assert_eq!(frame.sequence, last);
        assert_eq!(frame.as_bytes()[0], 3);

        let stats = slot.stats();
        assert_eq!(stats.published, 3);
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.frame_size, Some((4, 4)));
    }

    #[test]
    fn consumed_frame_is_not_returned_twice() {
        let slot = FrameSlot::new();
        let seq = slot.publish(solid(1, 1, 9));

        let frame = slot.latest_since(0).unwrap();
        assert!(slot.latest_since(frame.sequence).is_none());

        // 已被消费的帧被覆盖不算丢帧
        slot.publish(solid(1, 1, 10));
        assert_eq!(slot.stats().dropped, 0);
        assert!(slot.latest_since(seq).is_some());
    }

    #[test]
    fn snapshot_does_not_consume() {
        let slot = FrameSlot::new();
        slot.publish(solid(1, 1, 5));
        assert!(slot.snapshot().is_some());
        slot.publish(solid(1, 1, 6));
        assert_eq!(slot.stats().dropped, 1);
    }

    #[test]
    fn clear_resets_to_black() {
        let slot = FrameSlot::new();
        slot.publish(solid(1, 1, 5));
        slot.clear();
        assert!(slot.latest_since(0).is_none());
        assert_eq!(slot.stats().frame_size, None);
        assert_eq!(slot.stats().published, 1);
    }

    #[test]
    fn clones_share_the_slot() {
        let producer = FrameSlot::new();
        let consumer = producer.clone();
        producer.publish(solid(1, 1, 1));
        assert!(consumer.latest_since(0).is_some());
    }
}
