//! TIFF and PNG predictor decoding for Flate-compressed image samples.

use imgx_core::{Error, Result};

/// Reverse PNG row filters. Each row starts with its filter type byte.
pub fn undo_png(data: &[u8], colors: usize, bits: usize, columns: usize) -> Result<Vec<u8>> {
    let pixel_bytes = (colors * bits).div_ceil(8);
    let row_bytes = (columns * colors * bits).div_ceil(8);
    let stride = row_bytes + 1;

    if data.len() % stride != 0 {
        return Err(Error::ImageDecode(format!(
            "PNG predictor: {} bytes is not a multiple of row size {}",
            data.len(),
            stride
        )));
    }

    let mut output = Vec::with_capacity((data.len() / stride) * row_bytes);
    let mut previous = vec![0u8; row_bytes];
    let mut current = vec![0u8; row_bytes];

    for row in data.chunks_exact(stride) {
        let (filter, raw) = (row[0], &row[1..]);

        for i in 0..row_bytes {
            let left = if i >= pixel_bytes { current[i - pixel_bytes] } else { 0 };
            let up = previous[i];
            let up_left = if i >= pixel_bytes { previous[i - pixel_bytes] } else { 0 };

            let prediction = match filter {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((u16::from(left) + u16::from(up)) / 2) as u8,
                4 => paeth(left, up, up_left),
                other => {
                    return Err(Error::ImageDecode(format!("PNG filter type {}", other)));
                }
            };
            current[i] = raw[i].wrapping_add(prediction);
        }

        output.extend_from_slice(&current);
        std::mem::swap(&mut previous, &mut current);
    }

    Ok(output)
}

/// Reverse TIFF predictor 2 (horizontal differencing). Only 8-bit
/// components are supported.
pub fn undo_tiff(mut data: Vec<u8>, colors: usize, bits: usize, columns: usize) -> Result<Vec<u8>> {
    if bits != 8 {
        return Err(Error::ImageDecode(format!(
            "TIFF predictor with {} bits per component",
            bits
        )));
    }

    let row_bytes = columns * colors;
    for row in data.chunks_mut(row_bytes) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }

    Ok(data)
}

fn paeth(left: u8, up: u8, up_left: u8) -> u8 {
    let p = i16::from(left) + i16::from(up) - i16::from(up_left);
    let pa = (p - i16::from(left)).abs();
    let pb = (p - i16::from(up)).abs();
    let pc = (p - i16::from(up_left)).abs();

    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        up
    } else {
        up_left
    }
}
