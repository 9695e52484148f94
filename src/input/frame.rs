/// 原始解码帧与像素格式转换
/// Raw decoded frame and YUV420P → RGB24 conversion
use image::RgbImage;
use thiserror::Error;

/// 允许的最大边长
pub const MAX_DIMENSION: u32 = 8192;

/// 后端输出的原始帧 (YUV420P, 三个平面各自带步长)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub planes: [Vec<u8>; 3],
    pub strides: [usize; 3],
    /// 解码器标记的损坏帧
    pub corrupt: bool,
}

/// 单帧转换失败, 只丢弃这一帧
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame flagged as corrupt by decoder")]
    Corrupt,
    #[error("invalid resolution {0}x{1}")]
    Resolution(u32, u32),
    #[error("stride too small on plane {plane}: {stride}")]
    Stride { plane: usize, stride: usize },
    #[error("plane {plane} truncated: {len} < {needed}")]
    Truncated {
        plane: usize,
        len: usize,
        needed: usize,
    },
}

impl RawFrame {
    /// 用紧凑排列的平面构造 (步长 = 平面宽度)
    pub fn yuv420p(width: u32, height: u32, y: Vec<u8>, u: Vec<u8>, v: Vec<u8>) -> Self {
        let chroma_w = chroma_len(width as usize);
        Self {
            width,
            height,
            planes: [y, u, v],
            strides: [width as usize, chroma_w, chroma_w],
            corrupt: false,
        }
    }

    fn check(&self) -> Result<(), FrameError> {
        if self.corrupt {
            return Err(FrameError::Corrupt);
        }

        let (w, h) = (self.width, self.height);
        if w == 0 || h == 0 || w > MAX_DIMENSION || h > MAX_DIMENSION {
            return Err(FrameError::Resolution(w, h));
        }

        let (w, h) = (w as usize, h as usize);
        let widths = [w, chroma_len(w), chroma_len(w)];
        let rows = [h, chroma_len(h), chroma_len(h)];
        for plane in 0..3 {
            let stride = self.strides[plane];
            if stride < widths[plane] {
                return Err(FrameError::Stride { plane, stride });
            }
            // 最后一行不要求完整步长
            let needed = stride * (rows[plane] - 1) + widths[plane];
            let len = self.planes[plane].len();
            if len < needed {
                return Err(FrameError::Truncated { plane, len, needed });
            }
        }
        Ok(())
    }

    /// YUV420P → RGB24 (BT.601, 定点运算)
    pub fn to_rgb(&self) -> Result<RgbImage, FrameError> {
        self.check()?;

        let width = self.width as usize;
        let height = self.height as usize;
        let [y_plane, u_plane, v_plane] = &self.planes;
        let [y_stride, u_stride, v_stride] = self.strides;

        let mut buffer = vec![0u8; width * height * 3];
        let mut out_idx = 0;
        for y in 0..height {
            let y_row = y * y_stride;
            let u_row = (y >> 1) * u_stride;
            let v_row = (y >> 1) * v_stride;

            for x in 0..width {
                let y_val = y_plane[y_row + x] as i32;
                let u_val = u_plane[u_row + (x >> 1)] as i32 - 128;
                let v_val = v_plane[v_row + (x >> 1)] as i32 - 128;

                buffer[out_idx] = (y_val + ((v_val * 179) >> 7)).clamp(0, 255) as u8;
                buffer[out_idx + 1] =
                    (y_val - ((u_val * 44) >> 7) - ((v_val * 91) >> 7)).clamp(0, 255) as u8;
                buffer[out_idx + 2] = (y_val + ((u_val * 227) >> 7)).clamp(0, 255) as u8;
                out_idx += 3;
            }
        }

        // 尺寸已校验, 缓冲区长度必然匹配
        RgbImage::from_raw(self.width, self.height, buffer)
            .ok_or(FrameError::Resolution(self.width, self.height))
    }
}

fn chroma_len(n: usize) -> usize {
    n.div_ceil(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, y: u8, u: u8, v: u8) -> RawFrame {
        let cw = chroma_len(width as usize);
        let ch = chroma_len(height as usize);
        RawFrame::yuv420p(
            width,
            height,
            vec![y; (width * height) as usize],
            vec![u; cw * ch],
            vec![v; cw * ch],
        )
    }

    #[test]
    fn test_gray_stays_gray() {
        let img = solid(4, 2, 128, 128, 128).to_rgb().unwrap();
        assert_eq!(img.dimensions(), (4, 2));
        for px in img.pixels() {
            assert_eq!(px.0, [128, 128, 128]);
        }
    }

    #[test]
    fn test_extremes_clamp() {
        let white = solid(2, 2, 255, 128, 128).to_rgb().unwrap();
        assert_eq!(white.get_pixel(0, 0).0, [255, 255, 255]);

        // V 最大 → 红色通道饱和
        let red = solid(2, 2, 128, 128, 255).to_rgb().unwrap();
        let px = red.get_pixel(1, 1).0;
        assert_eq!(px[0], 255);
        assert!(px[1] < 128);
    }

    #[test]
    fn test_odd_dimensions_and_padding() {
        // 3x3, 每行带 5 字节步长
        let frame = RawFrame {
            width: 3,
            height: 3,
            planes: [vec![16; 5 * 2 + 3], vec![128; 3 + 2], vec![128; 3 + 2]],
            strides: [5, 3, 3],
            corrupt: false,
        };
        let img = frame.to_rgb().unwrap();
        assert_eq!(img.dimensions(), (3, 3));
        assert_eq!(img.get_pixel(2, 2).0, [16, 16, 16]);
    }

    #[test]
    fn test_rejects_bad_frames() {
        let mut corrupt = solid(2, 2, 0, 0, 0);
        corrupt.corrupt = true;
        assert_eq!(corrupt.to_rgb().unwrap_err(), FrameError::Corrupt);

        assert_eq!(
            RawFrame::default().to_rgb().unwrap_err(),
            FrameError::Resolution(0, 0)
        );

        let mut narrow = solid(4, 2, 0, 0, 0);
        narrow.strides[0] = 2;
        assert!(matches!(
            narrow.to_rgb().unwrap_err(),
            FrameError::Stride { plane: 0, .. }
        ));

        let mut short = solid(4, 4, 0, 0, 0);
        short.planes[2].truncate(1);
        assert!(matches!(
            short.to_rgb().unwrap_err(),
            FrameError::Truncated { plane: 2, .. }
        ));
    }
}
