use rtsp_viewer::{FrameSlot, VideoFrame};
use std::thread;
use std::time::Duration;

fn frame(value: u8) -> VideoFrame {
    VideoFrame::from_rgba(2, 2, vec![value; 16]).unwrap()
}

#[test]
fn slow_consumer_only_sees_newest_frames() {
    let slot = FrameSlot::new();
    let producer_slot = slot.clone();

    let producer = thread::spawn(move || {
        for i in 0..200u32 {
            producer_slot.publish(frame((i % 256) as u8));
            thread::sleep(Duration::from_micros(200));
        }
    });

    let mut seen = 0;
    let mut received = 0u64;
    while !producer.is_finished() {
        if let Some(f) = slot.latest_since(seen) {
            assert!(f.sequence > seen, "sequence must increase");
            seen = f.sequence;
            received += 1;
        }
        thread::sleep(Duration::from_millis(2));
    }
    producer.join().unwrap();

    // 收尾: 最后一帧一定能读到
    if let Some(f) = slot.latest_since(seen) {
        seen = f.sequence;
        received += 1;
    }

    let stats = slot.stats();
    assert_eq!(seen, 200);
    assert_eq!(stats.published, 200);
    assert!(received < 200);
    assert_eq!(stats.dropped, stats.published - received);
    assert_eq!(stats.frame_size, Some((2, 2)));
}

#[test]
fn frames_are_shared_not_copied() {
    let slot = FrameSlot::new();
    slot.publish(frame(7));

    let a = slot.latest_since(0).unwrap();
    let b = slot.snapshot().unwrap();
    assert_eq!(a.as_bytes().as_ptr(), b.as_bytes().as_ptr());
    assert!(slot.latest_since(a.sequence).is_none());
}
