/// 截图保存
use crate::error::{Result, ViewerError};
use crate::frame::VideoFrame;
use std::path::{Path, PathBuf};

pub fn gen_time_string(delimiter: &str) -> String {
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S{}%3f",
        delimiter, delimiter, delimiter, delimiter, delimiter, delimiter
    );
    chrono::Local::now().format(&fmt).to_string()
}

/// 当前帧保存为PNG, 文件名带时间戳
pub fn save_snapshot(frame: &VideoFrame, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let path = dir
        .as_ref()
        .join(format!("snapshot_{}.png", gen_time_string("-")));
    let image = image::RgbaImage::from_raw(frame.width, frame.height, frame.as_bytes().to_vec())
        .ok_or(ViewerError::InvalidFrame {
            width: frame.width,
            height: frame.height,
            stride: frame.width as usize * crate::frame::BYTES_PER_PIXEL,
            len: frame.as_bytes().len(),
        })?;
    image.save(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_png_with_timestamp_name() {
        let dir = tempfile::tempdir().unwrap();
        let frame = VideoFrame::from_rgba(2, 1, vec![255, 0, 0, 255, 0, 255, 0, 255]).unwrap();

        let path = save_snapshot(&frame, dir.path()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("snapshot_"));
        assert!(name.ends_with(".png"));

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (2, 1));
        assert_eq!(loaded.get_pixel(1, 0).0, [0, 255, 0, 255]);
    }

    #[test]
    fn time_string_uses_delimiter() {
        let s = gen_time_string("_");
        assert_eq!(s.matches('_').count(), 6);
    }
}
