#![cfg(feature = "neural_network")]

use approx::assert_relative_eq;
use ndarray::{Array2, Array4};
use rustystyle::error::ModelError;
use rustystyle::neural_network::layer::{Conv2D, PaddingType};
use rustystyle::neural_network::neural_network_trait::Layer;

fn patterned_conv(filters: usize, channels: usize, padding: PaddingType) -> Conv2D {
    let weights = Array4::from_shape_fn((filters, channels, 3, 3), |(f, c, i, j)| {
        ((f * 7 + c * 5 + i * 3 + j) as f32 * 0.37).sin()
    });
    let bias = Array2::from_shape_fn((1, filters), |(_, f)| 0.1 * f as f32);
    Conv2D::new(weights, bias, (1, 1), padding).unwrap()
}

#[test]
fn test_conv2d_forward_valid_values() {
    // A single 2x2 filter over a 3x3 input
    let weights = Array4::from_shape_vec((1, 1, 2, 2), vec![1.0, 0.0, 0.0, -1.0]).unwrap();
    let conv = Conv2D::new(weights, Array2::from_elem((1, 1), 0.5), (1, 1), PaddingType::Valid)
        .unwrap();

    let input = Array4::from_shape_vec((1, 1, 3, 3), (1..=9).map(|v| v as f32).collect())
        .unwrap()
        .into_dyn();
    let output = conv.forward(&input).unwrap();

    assert_eq!(output.shape(), &[1, 1, 2, 2]);
    // x[i][j] - x[i+1][j+1] is always -4, plus the bias
    for &value in output.iter() {
        assert_relative_eq!(value, -3.5);
    }
}

#[test]
fn test_conv2d_output_shapes() {
    let same = patterned_conv(4, 3, PaddingType::Same);
    assert_eq!(same.output_shape(&[2, 3, 7, 5]).unwrap(), vec![2, 4, 7, 5]);

    let valid = patterned_conv(4, 3, PaddingType::Valid);
    assert_eq!(valid.output_shape(&[1, 3, 7, 5]).unwrap(), vec![1, 4, 5, 3]);

    let strided = Conv2D::new(
        Array4::ones((2, 1, 3, 3)),
        Array2::zeros((1, 2)),
        (2, 2),
        PaddingType::Same,
    )
    .unwrap();
    assert_eq!(strided.output_shape(&[1, 1, 7, 8]).unwrap(), vec![1, 2, 4, 4]);

    let input = Array4::ones((1, 1, 7, 8)).into_dyn();
    assert_eq!(strided.forward(&input).unwrap().shape(), &[1, 2, 4, 4]);
}

#[test]
fn test_conv2d_backward_matches_finite_differences() {
    let conv = patterned_conv(2, 2, PaddingType::Same);
    let input = Array4::from_shape_fn((1, 2, 4, 5), |(_, c, i, j)| {
        ((c * 20 + i * 5 + j) as f32 * 0.61).cos()
    })
    .into_dyn();

    // Gradient of the linear functional sum(r * forward(x))
    let output_shape = conv.output_shape(input.shape()).unwrap();
    let r = Array4::from_shape_fn(
        (output_shape[0], output_shape[1], output_shape[2], output_shape[3]),
        |(_, f, i, j)| ((f * 11 + i * 3 + j) as f32 * 0.23).sin(),
    )
    .into_dyn();
    let grad = conv.backward(&input, &r).unwrap();
    assert_eq!(grad.shape(), input.shape());

    let functional = |x: &ndarray::ArrayD<f32>| -> f64 {
        let y = conv.forward(x).unwrap();
        y.iter().zip(r.iter()).map(|(&a, &b)| a as f64 * b as f64).sum()
    };

    let eps = 1e-2_f32;
    for index in [[0, 0, 0, 0], [0, 1, 2, 3], [0, 0, 3, 4], [0, 1, 1, 0]] {
        let mut plus = input.clone();
        plus[index] += eps;
        let mut minus = input.clone();
        minus[index] -= eps;

        let numeric = (functional(&plus) - functional(&minus)) / (2.0 * eps as f64);
        assert_relative_eq!(grad[index] as f64, numeric, epsilon = 1e-3, max_relative = 1e-2);
    }
}

#[test]
fn test_conv2d_rejects_wrong_channel_count() {
    let conv = patterned_conv(2, 3, PaddingType::Same);
    let input = Array4::<f32>::ones((1, 2, 4, 4)).into_dyn();

    assert!(matches!(conv.forward(&input), Err(ModelError::ShapeError(_))));
}

#[test]
fn test_conv2d_rejects_three_dimensional_input() {
    let conv = patterned_conv(2, 1, PaddingType::Same);
    let input = ndarray::Array3::<f32>::ones((1, 4, 4)).into_dyn();

    assert!(matches!(conv.forward(&input), Err(ModelError::ShapeError(_))));
    assert!(matches!(
        conv.backward(&input, &input),
        Err(ModelError::ShapeError(_))
    ));
}

#[test]
fn test_conv2d_backward_rejects_mismatched_gradient() {
    let conv = patterned_conv(2, 1, PaddingType::Same);
    let input = Array4::<f32>::ones((1, 1, 4, 4)).into_dyn();
    let grad = Array4::<f32>::ones((1, 3, 4, 4)).into_dyn();

    assert!(matches!(
        conv.backward(&input, &grad),
        Err(ModelError::ShapeError(_))
    ));
}

#[test]
fn test_conv2d_validates_construction() {
    let bias_mismatch = Conv2D::new(
        Array4::ones((3, 1, 3, 3)),
        Array2::zeros((1, 2)),
        (1, 1),
        PaddingType::Same,
    );
    assert!(matches!(bias_mismatch, Err(ModelError::InputValidationError(_))));

    let zero_stride = Conv2D::new(
        Array4::ones((1, 1, 3, 3)),
        Array2::zeros((1, 1)),
        (0, 1),
        PaddingType::Same,
    );
    assert!(matches!(zero_stride, Err(ModelError::InputValidationError(_))));
}

#[test]
fn test_conv2d_metadata() {
    let conv = patterned_conv(4, 3, PaddingType::Same);

    assert_eq!(conv.layer_type(), "Conv2D");
    assert_eq!(conv.get_filters(), 4);
    assert_eq!(conv.get_in_channels(), 3);
    assert_eq!(conv.param_count(), 4 * 3 * 3 * 3 + 4);
}

/// Number of positions `t * stride - pad + k` (k < kernel, t < outputs) that land on `i`.
fn cover_count(i: usize, outputs: usize, stride: usize, kernel: usize, pad: usize) -> f32 {
    (0..outputs)
        .filter(|&t| {
            let first = (t * stride) as isize - pad as isize;
            (first..first + kernel as isize).contains(&(i as isize))
        })
        .count() as f32
}

/// Number of taps of a window starting at `t * stride - pad` that fall inside `0..len`.
fn inside_count(t: usize, len: usize, stride: usize, kernel: usize, pad: usize) -> f32 {
    let first = (t * stride) as isize - pad as isize;
    (first..first + kernel as isize)
        .filter(|&p| p >= 0 && (p as usize) < len)
        .count() as f32
}

#[test]
fn test_conv2d_large_input_is_lowered_in_row_bands() {
    // 9 * 512 values per output row, so the 1024 rows need more than one band
    let conv = Conv2D::new(
        Array4::ones((1, 1, 3, 3)),
        Array2::zeros((1, 1)),
        (1, 1),
        PaddingType::Same,
    )
    .unwrap();
    let (height, width) = (1024, 512);
    let input = Array4::<f32>::ones((1, 1, height, width)).into_dyn();

    let output = conv.forward(&input).unwrap();
    assert_eq!(output.shape(), &[1, 1, height, width]);
    for ((_, _, i, j), &v) in output
        .view()
        .into_dimensionality::<ndarray::Ix4>()
        .unwrap()
        .indexed_iter()
    {
        assert_eq!(v, inside_count(i, height, 1, 3, 1) * inside_count(j, width, 1, 3, 1));
    }

    let grad = conv.backward(&input, &output.mapv(|_| 1.0)).unwrap();
    for ((_, _, i, j), &g) in grad
        .view()
        .into_dimensionality::<ndarray::Ix4>()
        .unwrap()
        .indexed_iter()
    {
        assert_eq!(g, cover_count(i, height, 1, 3, 1) * cover_count(j, width, 1, 3, 1));
    }
}

#[test]
fn test_conv2d_strided_bands_match_window_counts() {
    let conv = Conv2D::new(
        Array4::ones((2, 1, 3, 3)),
        Array2::from_elem((1, 2), 0.5),
        (2, 2),
        PaddingType::Valid,
    )
    .unwrap();
    let (height, width) = (2048, 1024);
    let (out_height, out_width) = (1023, 511);
    let input = Array4::<f32>::ones((1, 1, height, width)).into_dyn();

    let output = conv.forward(&input).unwrap();
    assert_eq!(output.shape(), &[1, 2, out_height, out_width]);
    assert!(output.iter().all(|&v| v == 9.5));

    let grad = conv.backward(&input, &output.mapv(|_| 1.0)).unwrap();
    assert_eq!(grad.shape(), input.shape());
    for i in [0, 1, 2, 3, 1822, 1823, 1824, 1825, 2045, 2046, 2047] {
        for j in [0, 1, 2, 511, 1021, 1022, 1023] {
            let expected = 2.0
                * cover_count(i, out_height, 2, 3, 0)
                * cover_count(j, out_width, 2, 3, 0);
            assert_relative_eq!(grad[[0, 0, i, j]], expected);
        }
    }
}
