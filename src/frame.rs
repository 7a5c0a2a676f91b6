/// 解码帧
/// Decoded RGBA frame handed from a decoder thread to the painter
use crate::error::{Result, ViewerError};
use std::sync::Arc;

pub const BYTES_PER_PIXEL: usize = 4;

/// 纹理尺寸上限 (macroquad 纹理宽高为 u16)
pub const MAX_DIMENSION: u32 = u16::MAX as u32;

fn valid_size(width: u32, height: u32) -> bool {
    (1..=MAX_DIMENSION).contains(&width) && (1..=MAX_DIMENSION).contains(&height)
}

/// 紧凑排列的RGBA帧 (无行填充)
#[derive(Clone, Debug)]
pub struct VideoFrame {
    pub rgba_data: Arc<Vec<u8>>, // Arc包装避免每帧clone
    pub width: u32,
    pub height: u32,
    pub sequence: u64, // 由FrameSlot在发布时分配
}

impl VideoFrame {
    /// 已紧凑排列的RGBA数据
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let row = width as usize * BYTES_PER_PIXEL;
        if !valid_size(width, height) || data.len() != row * height as usize {
            return Err(ViewerError::InvalidFrame {
                width,
                height,
                stride: row,
                len: data.len(),
            });
        }
        Ok(Self {
            rgba_data: Arc::new(data),
            width,
            height,
            sequence: 0,
        })
    }

    /// 解码器输出的平面通常带行填充 (stride >= width * 4), 逐行拷贝去掉填充
    pub fn from_rgba_strided(width: u32, height: u32, stride: usize, data: &[u8]) -> Result<Self> {
        let row = width as usize * BYTES_PER_PIXEL;
        let rows = height as usize;
        let invalid = || ViewerError::InvalidFrame {
            width,
            height,
            stride,
            len: data.len(),
        };

        if !valid_size(width, height) || stride < row {
            return Err(invalid());
        }
        // 最后一行可以没有填充
        let needed = stride * (rows - 1) + row;
        if data.len() < needed {
            return Err(invalid());
        }

        let packed = if stride == row {
            data[..row * rows].to_vec()
        } else {
            let mut packed = Vec::with_capacity(row * rows);
            for line in data.chunks(stride).take(rows) {
                packed.extend_from_slice(&line[..row]);
            }
            packed
        };

        Ok(Self {
            rgba_data: Arc::new(packed),
            width,
            height,
            sequence: 0,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.rgba_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strided_rows_are_repacked() {
        // 2x2, 每行末尾4字节填充
        let mut data = Vec::new();
        data.extend_from_slice(&[1, 1, 1, 255, 2, 2, 2, 255, 0, 0, 0, 0]);
        data.extend_from_slice(&[3, 3, 3, 255, 4, 4, 4, 255, 9, 9, 9, 9]);

        let frame = VideoFrame::from_rgba_strided(2, 2, 12, &data).unwrap();
        assert_eq!(frame.size(), (2, 2));
        assert_eq!(
            frame.as_bytes(),
            &[1, 1, 1, 255, 2, 2, 2, 255, 3, 3, 3, 255, 4, 4, 4, 255]
        );
    }

    #[test]
    fn last_row_may_omit_padding() {
        let mut data = vec![7u8; 12];
        data.extend_from_slice(&[8u8; 8]);
        let frame = VideoFrame::from_rgba_strided(2, 2, 12, &data).unwrap();
        assert_eq!(&frame.as_bytes()[8..], &[8u8; 8]);
    }

    #[test]
    fn rejects_short_stride_and_short_buffer() {
        assert!(VideoFrame::from_rgba_strided(4, 2, 8, &[0u8; 64]).is_err());
        assert!(VideoFrame::from_rgba_strided(4, 2, 16, &[0u8; 20]).is_err());
        assert!(VideoFrame::from_rgba_strided(0, 2, 16, &[0u8; 64]).is_err());
    }

    #[test]
    fn packed_input_must_match_size() {
        assert!(VideoFrame::from_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            VideoFrame::from_rgba(2, 2, vec![0; 15]),
            Err(ViewerError::InvalidFrame { .. })
        ));
    }

    #[test]
    fn rejects_sizes_beyond_texture_limit() {
        let tall = MAX_DIMENSION as usize + 1;
        assert!(VideoFrame::from_rgba(1, MAX_DIMENSION, vec![0; MAX_DIMENSION as usize * 4]).is_ok());
        assert!(VideoFrame::from_rgba(1, tall as u32, vec![0; tall * 4]).is_err());
        assert!(VideoFrame::from_rgba_strided(1, tall as u32, 4, &vec![0; tall * 4]).is_err());
    }
}
