use super::*;

fn ramp(size: ImageSize) -> ImageData {
    let pixels = (0..size.pixel_count()).map(|i| i as f64).collect();
    ImageData::from_channel(size, pixels)
}

#[test]
fn test_image_size_scaling() {
    let size = ImageSize::new(12, 8);
    assert_eq!(size.pixel_count(), 96);
    assert_eq!(size.downscaled(4), ImageSize::new(3, 2));
    assert_eq!(size.downscaled(4).upscaled(4), size);
}

#[test]
#[should_panic(expected = "not divisible")]
fn test_image_size_downscale_not_divisible() {
    ImageSize::new(10, 8).downscaled(3);
}

#[test]
#[should_panic(expected = "Width must be positive")]
fn test_image_size_zero_width() {
    ImageSize::new(0, 4);
}

#[test]
fn test_pixel_access() {
    let mut image = ImageData::new(ImageSize::new(3, 2), 2);
    assert_eq!(image.num_channels(), 2);
    assert_eq!(image.num_pixels(), 6);

    image.set_pixel(1, 4, 2.5);
    assert_eq!(image.pixel(1, 4), 2.5);
    assert_eq!(image.pixel(0, 4), 0.0);

    image.channel_mut(0)[5] = -1.0;
    assert_eq!(image.channel(0)[5], -1.0);
}

#[test]
#[should_panic(expected = "Channel 0 has 5 pixels")]
fn test_from_channel_length_mismatch() {
    ImageData::from_channel(ImageSize::new(3, 2), vec![0.0; 5]);
}

#[test]
fn test_extract_and_into_channel() {
    let size = ImageSize::new(2, 2);
    let image = ImageData::from_channels(size, vec![vec![1.0; 4], vec![2.0; 4], vec![3.0; 4]]);

    let green = image.extract_channel(1);
    assert_eq!(green.num_channels(), 1);
    assert_eq!(green.channel(0), &[2.0; 4]);

    assert_eq!(image.clone().into_channel(2), vec![3.0; 4]);
    assert_eq!(image.into_channels().len(), 3);
}

#[test]
fn test_resize_same_size_is_identity() {
    let size = ImageSize::new(5, 3);
    let original = ramp(size);

    for interpolation in [Interpolation::Nearest, Interpolation::Linear] {
        let mut image = original.clone();
        image.resize(size, interpolation);
        assert_eq!(image, original, "{} resize changed the image", interpolation);
    }
}

#[test]
fn test_resize_nearest_replicates() {
    let mut image = ImageData::from_channel(ImageSize::new(2, 2), vec![1.0, 2.0, 3.0, 4.0]);
    image.resize(ImageSize::new(4, 4), Interpolation::Nearest);

    #[rustfmt::skip]
    let expected = vec![
        1.0, 1.0, 2.0, 2.0,
        1.0, 1.0, 2.0, 2.0,
        3.0, 3.0, 4.0, 4.0,
        3.0, 3.0, 4.0, 4.0,
    ];
    assert_eq!(image.channel(0), expected.as_slice());
}

#[test]
fn test_resize_nearest_decimates() {
    let mut image = ramp(ImageSize::new(4, 4));
    image.resize(ImageSize::new(2, 2), Interpolation::Nearest);
    assert_eq!(image.channel(0), &[0.0, 2.0, 8.0, 10.0]);
}

#[test]
fn test_resize_linear_constant_preserved() {
    let mut image = ImageData::filled(ImageSize::new(3, 5), 0.75);
    image.resize(ImageSize::new(7, 4), Interpolation::Linear);
    assert_eq!(image.size(), ImageSize::new(7, 4));
    for &v in image.channel(0) {
        assert!((v - 0.75).abs() < 1e-12);
    }
}

#[test]
fn test_resize_linear_interpolates_between_centers() {
    // 2 -> 4 upsampling: destination centers map to source -0.25, 0.25, 0.75, 1.25.
    let mut image = ImageData::from_channel(ImageSize::new(2, 1), vec![0.0, 1.0]);
    image.resize(ImageSize::new(4, 1), Interpolation::Linear);
    let expected = [0.0, 0.25, 0.75, 1.0];
    for (v, e) in image.channel(0).iter().zip(expected) {
        assert!((v - e).abs() < 1e-12, "got {}, expected {}", v, e);
    }
}

#[test]
fn test_resize_applies_to_every_channel() {
    let size = ImageSize::new(2, 2);
    let mut image = ImageData::from_channels(size, vec![vec![1.0; 4], vec![5.0; 4]]);
    image.resize(ImageSize::new(6, 6), Interpolation::Linear);
    assert!(image.channel(0).iter().all(|&v| (v - 1.0).abs() < 1e-12));
    assert!(image.channel(1).iter().all(|&v| (v - 5.0).abs() < 1e-12));
}

#[test]
fn test_psnr() {
    let size = ImageSize::new(4, 4);
    let a = ImageData::filled(size, 0.5);
    let b = ImageData::filled(size, 0.6);

    assert!((a.mean_squared_error(&b) - 0.01).abs() < 1e-12);
    assert!((a.psnr(&b, 1.0) - 20.0).abs() < 1e-9);
    assert!(a.psnr(&a, 1.0).is_infinite());
}
