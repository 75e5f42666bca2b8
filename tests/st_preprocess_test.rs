#![cfg(feature = "style_transfer")]

use approx::assert_relative_eq;
use image::{Rgb, RgbImage};
use ndarray::IxDyn;
use rustystyle::error::ModelError;
use rustystyle::neural_network::{Architecture, PoolingMethod, Tensor};
use rustystyle::style_transfer::Preprocessor;

fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 37 % 256) as u8,
            (y * 53 % 256) as u8,
            ((x + y) * 19 % 256) as u8,
        ])
    })
}

#[test]
fn test_to_tensor_layout_and_values() {
    let preprocessor = Preprocessor::new(vec![0.5, 0.25, 0.0], vec![0, 1, 2], 1.0).unwrap();
    let image = gradient_image(5, 3);
    let tensor = preprocessor.to_tensor(&image);

    assert_eq!(tensor.shape(), &[1, 3, 3, 5]);
    let pixel = image.get_pixel(4, 2);
    assert_relative_eq!(tensor[[0, 0, 2, 4]], pixel[0] as f32 / 255.0 - 0.5);
    assert_relative_eq!(tensor[[0, 1, 2, 4]], pixel[1] as f32 / 255.0 - 0.25);
    assert_relative_eq!(tensor[[0, 2, 2, 4]], pixel[2] as f32 / 255.0);
}

#[test]
fn test_channel_swap_reorders_channels() {
    let preprocessor = Preprocessor::new(vec![0.0; 3], vec![2, 0, 1], 255.0).unwrap();
    let image = RgbImage::from_pixel(1, 1, Rgb([10, 20, 30]));
    let tensor = preprocessor.to_tensor(&image);

    assert_relative_eq!(tensor[[0, 0, 0, 0]], 30.0);
    assert_relative_eq!(tensor[[0, 1, 0, 0]], 10.0);
    assert_relative_eq!(tensor[[0, 2, 0, 0]], 20.0);
}

#[test]
fn test_round_trip() {
    let image = gradient_image(7, 4);

    let simple = Preprocessor::new(vec![0.5, 0.5, 0.5], vec![0, 1, 2], 1.0).unwrap();
    assert_eq!(simple.to_image(&simple.to_tensor(&image)).unwrap(), image);

    let vgg = Architecture::vgg19(PoolingMethod::Average);
    let caffe = Preprocessor::from_architecture(&vgg).unwrap();
    assert_eq!(caffe.to_image(&caffe.to_tensor(&image)).unwrap(), image);
}

#[test]
fn test_to_image_clips() {
    let preprocessor = Preprocessor::new(vec![0.0; 3], vec![0, 1, 2], 255.0).unwrap();
    let mut tensor = Tensor::zeros(IxDyn(&[1, 3, 1, 2]));
    tensor[[0, 0, 0, 0]] = 1000.0;
    tensor[[0, 1, 0, 0]] = -40.0;
    tensor[[0, 2, 0, 0]] = 127.6;
    tensor[[0, 0, 0, 1]] = 254.4;

    let image = preprocessor.to_image(&tensor).unwrap();
    assert_eq!(image.dimensions(), (2, 1));
    assert_eq!(image.get_pixel(0, 0), &Rgb([255, 0, 128]));
    assert_eq!(image.get_pixel(1, 0), &Rgb([254, 0, 0]));
}

#[test]
fn test_new_rejects_bad_parameters() {
    let cases = [
        (vec![0.0, 0.0], vec![0, 1, 2], 1.0),
        (vec![0.0, f32::NAN, 0.0], vec![0, 1, 2], 1.0),
        (vec![0.0; 3], vec![0, 0, 1], 1.0),
        (vec![0.0; 3], vec![0, 1, 3], 1.0),
        (vec![0.0; 3], vec![0, 1], 1.0),
        (vec![0.0; 3], vec![0, 1, 2], 0.0),
        (vec![0.0; 3], vec![0, 1, 2], -1.0),
        (vec![0.0; 3], vec![0, 1, 2], f32::INFINITY),
    ];

    for (mean, swap, scale) in cases {
        assert!(matches!(
            Preprocessor::new(mean, swap, scale),
            Err(ModelError::ConfigurationError(_))
        ));
    }
}

#[test]
fn test_to_image_rejects_wrong_shapes() {
    let preprocessor = Preprocessor::new(vec![0.0; 3], vec![0, 1, 2], 1.0).unwrap();

    for shape in [&[1, 4, 2, 2][..], &[2, 3, 2, 2], &[3, 2, 2]] {
        let tensor = Tensor::zeros(IxDyn(shape));
        assert!(matches!(
            preprocessor.to_image(&tensor),
            Err(ModelError::ShapeError(_))
        ));
    }
}
