/// 帧率统计
/// Per-second rate counter used for decode and render FPS
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(1);

#[derive(Clone, Debug)]
pub struct FpsCounter {
    count: usize,
    last: Instant,
    current_fps: f64,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self {
            count: 0,
            last: now,
            current_fps: 0.0,
        }
    }

    /// 记录一帧; 满一秒时更新帧率并返回 Some(fps)
    pub fn tick(&mut self) -> Option<f64> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<f64> {
        self.count += 1;
        let elapsed = now.saturating_duration_since(self.last);
        if elapsed < WINDOW {
            return None;
        }
        self.current_fps = self.count as f64 / elapsed.as_secs_f64();
        self.count = 0;
        self.last = now;
        Some(self.current_fps)
    }

    pub fn fps(&self) -> f64 {
        self.current_fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_second() {
        let start = Instant::now();
        let mut fps = FpsCounter::starting_at(start);

        for i in 1..30 {
            assert_eq!(fps.tick_at(start + Duration::from_millis(i * 30)), None);
        }
        let rate = fps.tick_at(start + Duration::from_secs(1)).unwrap();
        assert!((rate - 30.0).abs() < 1e-9);
        assert!((fps.fps() - 30.0).abs() < 1e-9);

        // 新窗口从零计数
        assert_eq!(fps.tick_at(start + Duration::from_millis(1500)), None);
        let rate = fps.tick_at(start + Duration::from_secs(2)).unwrap();
        assert!((rate - 2.0).abs() < 1e-9);
    }
}
