use tracing::info;

use crate::backend::allocator::{PixelView, BYTES_PER_PIXEL};
use crate::backend::drm::Error;
use crate::decode::DecodedImage;
use crate::utils::{Buffer, Physical, Point, Rectangle, Size};

/// Where a source image lands inside a destination buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Factor applied to both dimensions of the source
    pub scale: f32,
    /// Area covered by the scaled image, in destination coordinates
    pub dst: Rectangle<u32, Physical>,
}

/// Compute the largest aspect preserving placement of `src` inside `dst`
///
/// The scaled image is centered, rounding the offsets down. Returns `None` if
/// either size is empty.
pub fn placement(src: Size<u32, Buffer>, dst: Size<u32, Physical>) -> Option<Placement> {
    if src.is_empty() || dst.is_empty() {
        return None;
    }

    let (src_f, dst_f) = (src.to_f32(), dst.to_f32());
    let scale = (dst_f.w / src_f.w).min(dst_f.h / src_f.h);

    let scaled = Size::new(
        ((src.w as f32 * scale) as u32).min(dst.w),
        ((src.h as f32 * scale) as u32).min(dst.h),
    );
    let offset = Point::new((dst.w - scaled.w) / 2, (dst.h - scaled.h) / 2);

    let area = Rectangle::new(offset, scaled);
    debug_assert!(area.fits_within(&Rectangle::from_size(dst)));

    Some(Placement { scale, dst: area })
}

/// Pack rgb samples into an opaque xrgb8888 cell
#[inline]
pub fn pack_xrgb(r: u8, g: u8, b: u8) -> u32 {
    0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Scale `image` into `view`, centered and with its aspect ratio preserved
///
/// Sampling is nearest-neighbor. Pixels of `view` outside the returned
/// placement are left untouched, so the view should be cleared beforehand.
#[profiling::function]
pub fn blit(image: &DecodedImage, view: &mut PixelView<'_>) -> Result<Placement, Error> {
    let src = image.size();
    let dst = view.size();
    let len = image.pixels().len();

    let expected = (src.w as usize)
        .checked_mul(src.h as usize)
        .and_then(|n| n.checked_mul(DecodedImage::CHANNELS));
    let placement = placement(src, dst)
        .filter(|_| matches!(expected, Some(expected) if len >= expected))
        .ok_or(Error::InvalidImageDimensions { src, len, dst })?;

    let Placement { scale, dst: area } = placement;
    info!(
        "Scaling image from {} to {}, centered at {},{}",
        src, area.size, area.loc.x, area.loc.y
    );

    for y in 0..area.size.h {
        let src_y = ((y as f32 / scale) as u32).min(src.h - 1);
        let Some(row) = view.row_mut(area.loc.y + y) else {
            continue;
        };

        for x in 0..area.size.w {
            let src_x = ((x as f32 / scale) as u32).min(src.w - 1);
            let start = (area.loc.x + x) as usize * BYTES_PER_PIXEL;
            let (Some(cell), Some((r, g, b))) = (
                row.get_mut(start..start + BYTES_PER_PIXEL),
                image.rgb(src_x, src_y),
            ) else {
                continue;
            };
            cell.copy_from_slice(&pack_xrgb(r, g, b).to_le_bytes());
        }
    }

    Ok(placement)
}

#[cfg(test)]
mod tests {
    use super::{blit, pack_xrgb, placement};
    use crate::backend::allocator::PixelView;
    use crate::backend::drm::Error;
    use crate::decode::DecodedImage;
    use crate::utils::{Buffer, Physical, Size};

    const RED: u32 = 0xFFFF_0000;
    const BLUE: u32 = 0xFF00_00FF;

    fn red_blue() -> DecodedImage {
        DecodedImage::from_rgb8((2, 1), vec![0xFF, 0, 0, 0, 0, 0xFF])
    }

    #[test]
    fn packs_opaque_xrgb() {
        assert_eq!(pack_xrgb(0xFF, 0, 0), RED);
        assert_eq!(pack_xrgb(0, 0, 0xFF), BLUE);
        assert_eq!(pack_xrgb(0x12, 0x34, 0x56), 0xFF12_3456);
    }

    #[test]
    fn red_blue_into_4x4() {
        let mut data = vec![0u8; 4 * 4 * 4];
        let mut view = PixelView::new(&mut data, Size::new(4, 4), 16).unwrap();

        let placement = blit(&red_blue(), &mut view).unwrap();
        assert_eq!(placement.scale, 2.0);
        assert_eq!((placement.dst.loc.x, placement.dst.loc.y), (0, 1));
        assert_eq!((placement.dst.size.w, placement.dst.size.h), (4, 2));

        for y in [1, 2] {
            assert_eq!(view.get_pixel(0, y), Some(RED));
            assert_eq!(view.get_pixel(1, y), Some(RED));
            assert_eq!(view.get_pixel(2, y), Some(BLUE));
            assert_eq!(view.get_pixel(3, y), Some(BLUE));
        }
        for y in [0, 3] {
            for x in 0..4 {
                assert_eq!(view.get_pixel(x, y), Some(0));
            }
        }
    }

    #[test]
    fn untouched_outside_placement() {
        let mut data = vec![0u8; 4 * 4 * 4];
        let mut view = PixelView::new(&mut data, Size::new(4, 4), 16).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                view.set_pixel(x, y, 0x1234_5678);
            }
        }

        blit(&red_blue(), &mut view).unwrap();
        for x in 0..4 {
            assert_eq!(view.get_pixel(x, 0), Some(0x1234_5678));
            assert_eq!(view.get_pixel(x, 3), Some(0x1234_5678));
        }
    }

    #[test]
    fn respects_pitch_padding() {
        // 4 pixels per row, rows padded to 24 bytes
        let mut data = vec![0u8; 24 * 4];
        let mut view = PixelView::new(&mut data, Size::new(4, 4), 24).unwrap();
        blit(&red_blue(), &mut view).unwrap();
        assert_eq!(view.get_pixel(3, 2), Some(BLUE));

        for row in data.chunks(24) {
            assert!(row[16..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn blit_is_idempotent() {
        let image = DecodedImage::from_rgb8(
            (3, 5),
            (0..3 * 5 * 3).map(|v| (v * 17) as u8).collect::<Vec<_>>(),
        );

        let mut first = vec![0u8; 7 * 4 * 9];
        let mut view = PixelView::new(&mut first, Size::new(7, 9), 28).unwrap();
        view.clear();
        blit(&image, &mut view).unwrap();

        let mut second = vec![0u8; 7 * 4 * 9];
        let mut view = PixelView::new(&mut second, Size::new(7, 9), 28).unwrap();
        view.clear();
        blit(&image, &mut view).unwrap();
        view.clear();
        blit(&image, &mut view).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn downscales_with_nearest_neighbor() {
        // 4x2 checker columns into 2x1: every other column is sampled
        let image = DecodedImage::from_rgb8(
            (4, 2),
            [[0xFFu8, 0, 0], [0, 0xFF, 0], [0, 0, 0xFF], [0xFF, 0xFF, 0xFF]]
                .repeat(2)
                .concat(),
        );
        let mut data = vec![0u8; 2 * 4];
        let mut view = PixelView::new(&mut data, Size::new(2, 1), 8).unwrap();
        let placement = blit(&image, &mut view).unwrap();

        assert_eq!(placement.scale, 0.5);
        assert_eq!(view.get_pixel(0, 0), Some(RED));
        assert_eq!(view.get_pixel(1, 0), Some(BLUE));
    }

    #[test]
    fn rejects_empty_source() {
        let image = DecodedImage::from_rgb8((0, 10), Vec::new());
        let mut data = vec![0u8; 16];
        let mut view = PixelView::new(&mut data, Size::new(2, 2), 8).unwrap();
        assert!(matches!(
            blit(&image, &mut view),
            Err(Error::InvalidImageDimensions { .. })
        ));
        assert!(data.iter().all(|&b| b == 0));
    }

    #[test]
    fn rejects_empty_destination() {
        let mut data = Vec::<u8>::new();
        let mut view = PixelView::new(&mut data, Size::new(0, 0), 0).unwrap();
        assert!(matches!(
            blit(&red_blue(), &mut view),
            Err(Error::InvalidImageDimensions { .. })
        ));
    }

    #[test]
    fn rejects_truncated_samples() {
        let image = DecodedImage::from_rgb8((2, 2), vec![0xFF; 9]);
        let mut data = vec![0u8; 16];
        let mut view = PixelView::new(&mut data, Size::new(2, 2), 8).unwrap();
        assert!(matches!(
            blit(&image, &mut view),
            Err(Error::InvalidImageDimensions { len: 9, .. })
        ));
    }

    #[test]
    fn placement_fits_and_is_centered() {
        let sources = [1u32, 2, 3, 7, 16, 33, 100, 641, 1080, 1921, 4096];
        let targets = [1u32, 2, 5, 64, 480, 720, 1080, 1366, 1920, 2160, 3840];

        for &sw in &sources {
            for &sh in &sources {
                for &dw in &targets {
                    for &dh in &targets {
                        let src = Size::<u32, Buffer>::new(sw, sh);
                        let dst = Size::<u32, Physical>::new(dw, dh);
                        let p = placement(src, dst).unwrap();
                        let area = p.dst;

                        assert!(area.size.w <= dw && area.size.h <= dh, "{src:?} -> {dst:?}: {p:?}");
                        assert!(area.loc.x + area.size.w <= dw, "{src:?} -> {dst:?}: {p:?}");
                        assert!(area.loc.y + area.size.h <= dh, "{src:?} -> {dst:?}: {p:?}");
                        assert_eq!(area.loc.x, (dw - area.size.w) / 2);
                        assert_eq!(area.loc.y, (dh - area.size.h) / 2);
                        assert_eq!(area.size.w, ((sw as f32 * p.scale) as u32).min(dw));
                        assert_eq!(area.size.h, ((sh as f32 * p.scale) as u32).min(dh));
                    }
                }
            }
        }
    }

    #[test]
    fn placement_preserves_aspect_ratio() {
        let cases = [
            ((2u32, 1u32), (4u32, 4u32)),
            ((1920, 1080), (1280, 1024)),
            ((640, 480), (1920, 1080)),
            ((1000, 3000), (2560, 1440)),
            ((333, 777), (800, 600)),
        ];

        for ((sw, sh), (dw, dh)) in cases {
            let p = placement(Size::new(sw, sh), Size::new(dw, dh)).unwrap();
            // both dimensions use the same factor, truncation loses less than a pixel each
            let w = sw as f32 * p.scale;
            let h = sh as f32 * p.scale;
            assert!(w >= p.dst.size.w as f32 && w - (p.dst.size.w as f32) < 1.0);
            assert!(h >= p.dst.size.h as f32 && h - (p.dst.size.h as f32) < 1.0);
            assert_eq!(p.scale, (dw as f32 / sw as f32).min(dh as f32 / sh as f32));
        }
    }

    #[test]
    fn placement_of_empty_sizes() {
        assert!(placement(Size::new(0, 1), Size::new(4, 4)).is_none());
        assert!(placement(Size::new(1, 0), Size::new(4, 4)).is_none());
        assert!(placement(Size::new(1, 1), Size::new(0, 4)).is_none());
        assert!(placement(Size::new(1, 1), Size::new(4, 0)).is_none());
    }
}
