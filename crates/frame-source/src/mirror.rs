use crate::Frame;

/// Horizontally flipped copy of `frame`.
pub fn mirror(frame: &Frame) -> Frame {
    let mut out = frame.clone();
    mirror_in_place(&mut out);
    out
}

/// Flip each row left to right, keeping channel order within a pixel.
///
/// Frames whose buffer is shorter than `width * height` pixels are left untouched.
pub fn mirror_in_place(frame: &mut Frame) {
    let bpp = frame.pixel_format.bytes_per_pixel();
    let stride = frame.stride();
    if stride == 0 || !frame.is_complete() {
        return;
    }
    for row in frame
        .data
        .chunks_exact_mut(stride)
        .take(frame.height as usize)
    {
        row.reverse();
        if bpp > 1 {
            for pixel in row.chunks_exact_mut(bpp) {
                pixel.reverse();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PixelFormat;

    fn ramp(width: u32, height: u32, format: PixelFormat) -> Frame {
        let len = (width * height) as usize * format.bytes_per_pixel();
        let data = (0..len).map(|i| (i % 251) as u8).collect();
        Frame::new(width, height, format, data)
    }

    #[test]
    fn gray_row_is_reversed() {
        let frame = Frame::new(3, 2, PixelFormat::Gray8, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(mirror(&frame).data, vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn rgb_pixels_keep_channel_order() {
        let frame = Frame::new(
            2,
            1,
            PixelFormat::Rgb8,
            vec![10, 11, 12, 20, 21, 22],
        );
        assert_eq!(mirror(&frame).data, vec![20, 21, 22, 10, 11, 12]);
    }

    #[test]
    fn mirror_twice_is_identity() {
        for format in [PixelFormat::Gray8, PixelFormat::Rgb8, PixelFormat::Bgr8] {
            for (w, h) in [(1, 1), (2, 3), (7, 5), (64, 48)] {
                let frame = ramp(w, h, format);
                assert_eq!(mirror(&mirror(&frame)), frame, "{format:?} {w}x{h}");
            }
        }
    }

    #[test]
    fn short_buffer_is_left_alone() {
        let mut frame = Frame::new(4, 4, PixelFormat::Rgb8, vec![1, 2, 3, 4, 5, 6]);
        let before = frame.clone();
        mirror_in_place(&mut frame);
        assert_eq!(frame, before);
    }

    #[test]
    fn trailing_bytes_past_the_image_are_kept() {
        let mut frame = Frame::new(2, 1, PixelFormat::Gray8, vec![1, 2, 9]);
        mirror_in_place(&mut frame);
        assert_eq!(frame.data, vec![2, 1, 9]);
    }
}
