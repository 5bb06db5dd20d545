//! Raw image samples: predictor decoding, colour spaces and PNG output.

use crate::resources::resolve_dict;
use imgx_core::convert::{encode_png, from_samples};
use imgx_core::{Error, Result};
use lopdf::{Dictionary, Document, Object, Stream};

/// How samples map to pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorModel {
    /// Direct components per pixel: 1 gray, 3 RGB, 4 CMYK.
    Components(usize),
    /// One index per pixel into a palette of `base`-component colours.
    Indexed {
        /// Components per palette entry.
        base: usize,
        /// Highest valid index.
        hival: usize,
        /// Palette bytes, `(hival + 1) * base` long.
        lookup: Vec<u8>,
    },
}

/// Re-encode the decoded samples of an image XObject as PNG.
///
/// `samples` must already be inflated. Predictors from `/DecodeParms` are
/// undone here.
pub fn samples_to_png(doc: &Document, stream: &Stream, samples: Vec<u8>) -> Result<Vec<u8>> {
    let dict = &stream.dict;
    let bits = int_entry(doc, dict, b"BitsPerComponent").unwrap_or(8);
    if bits != 8 {
        return Err(Error::ImageDecode(format!("{} bits per component", bits)));
    }

    let width = dimension(doc, dict, b"Width")?;
    let height = dimension(doc, dict, b"Height")?;
    let samples = undo_predictor(doc, dict, samples)?;

    let model = match dict.get(b"ColorSpace") {
        Ok(object) => color_model(doc, object)?,
        // No colour space: infer from the sample count
        Err(_) => {
            let pixels = (width as usize) * (height as usize);
            if pixels == 0 || samples.len() % pixels != 0 {
                return Err(Error::ImageDecode("cannot infer colour space".to_string()));
            }
            ColorModel::Components(samples.len() / pixels)
        }
    };

    let (channels, pixels) = match model {
        ColorModel::Components(n) => (n, samples),
        ColorModel::Indexed { base, hival, lookup } => {
            (base, expand_palette(&samples, base, hival, &lookup))
        }
    };

    let image = from_samples(width, height, channels, false, pixels)?;
    encode_png(&image)
}

/// Resolve a `/ColorSpace` entry.
pub fn color_model(doc: &Document, object: &Object) -> Result<ColorModel> {
    let object = doc
        .dereference(object)
        .map_err(|e| Error::ImageDecode(format!("colour space: {}", e)))?
        .1;

    match object {
        Object::Name(name) => named_components(name).map(ColorModel::Components),
        Object::Array(array) => {
            let family = array
                .first()
                .and_then(|o| o.as_name().ok())
                .ok_or_else(|| Error::ImageDecode("empty colour space array".to_string()))?;

            match family {
                b"ICCBased" => {
                    let n = array
                        .get(1)
                        .and_then(|o| doc.dereference(o).ok())
                        .and_then(|(_, o)| o.as_stream().ok())
                        .and_then(|s| int_entry(doc, &s.dict, b"N"))
                        .ok_or_else(|| Error::ImageDecode("ICCBased without /N".to_string()))?;
                    Ok(ColorModel::Components(n as usize))
                }
                b"Indexed" | b"I" => indexed(doc, array),
                other => named_components(other).map(ColorModel::Components),
            }
        }
        _ => Err(Error::ImageDecode("malformed colour space".to_string())),
    }
}

/// Component count of a device or calibrated colour space family.
fn named_components(name: &[u8]) -> Result<usize> {
    match name {
        b"DeviceGray" | b"CalGray" | b"G" => Ok(1),
        b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(3),
        b"DeviceCMYK" | b"CMYK" => Ok(4),
        other => Err(Error::ImageDecode(format!(
            "{} colour space",
            String::from_utf8_lossy(other)
        ))),
    }
}

/// `[/Indexed base hival lookup]`
fn indexed(doc: &Document, array: &[Object]) -> Result<ColorModel> {
    let [_, base, hival, lookup] = array else {
        return Err(Error::ImageDecode("Indexed needs 4 entries".to_string()));
    };

    let base = match color_model(doc, base)? {
        ColorModel::Components(n) => n,
        ColorModel::Indexed { .. } => {
            return Err(Error::ImageDecode("nested Indexed colour space".to_string()))
        }
    };

    let hival = doc
        .dereference(hival)
        .ok()
        .and_then(|(_, o)| o.as_i64().ok())
        .and_then(|v| usize::try_from(v).ok())
        .filter(|v| *v <= 255)
        .ok_or_else(|| Error::ImageDecode("bad Indexed hival".to_string()))?;

    let lookup = match doc.dereference(lookup).map(|(_, o)| o) {
        Ok(Object::String(bytes, _)) => bytes.clone(),
        Ok(Object::Stream(stream)) => stream
            .get_plain_content()
            .map_err(|e| Error::ImageDecode(format!("Indexed lookup: {}", e)))?,
        _ => return Err(Error::ImageDecode("bad Indexed lookup".to_string())),
    };

    if lookup.len() < (hival + 1) * base {
        return Err(Error::ImageDecode(format!(
            "Indexed lookup has {} bytes, needs {}",
            lookup.len(),
            (hival + 1) * base
        )));
    }

    Ok(ColorModel::Indexed { base, hival, lookup })
}

/// Replace each palette index with its colour. Out-of-range indices clamp
/// to `hival`.
fn expand_palette(indices: &[u8], base: usize, hival: usize, lookup: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(indices.len() * base);
    for &index in indices {
        let start = usize::from(index).min(hival) * base;
        out.extend_from_slice(&lookup[start..start + base]);
    }
    out
}

/// Undo the TIFF or PNG predictor named in `/DecodeParms`, if any.
fn undo_predictor(doc: &Document, dict: &Dictionary, samples: Vec<u8>) -> Result<Vec<u8>> {
    let Some(params) = decode_parms(doc, dict) else {
        return Ok(samples);
    };

    let predictor = int_entry(doc, params, b"Predictor").unwrap_or(1);
    let colors = int_entry(doc, params, b"Colors").unwrap_or(1).max(1) as usize;
    let bits = int_entry(doc, params, b"BitsPerComponent").unwrap_or(8).max(1) as usize;
    let columns = int_entry(doc, params, b"Columns").unwrap_or(1).max(1) as usize;

    match predictor {
        1 => Ok(samples),
        2 => crate::predictor::undo_tiff(samples, colors, bits, columns),
        10..=15 => crate::predictor::undo_png(&samples, colors, bits, columns),
        other => Err(Error::ImageDecode(format!("predictor {}", other))),
    }
}

/// `/DecodeParms` for the Flate filter; arrays hold one entry per filter.
fn decode_parms<'a>(doc: &'a Document, dict: &'a Dictionary) -> Option<&'a Dictionary> {
    let params = doc.dereference(dict.get(b"DecodeParms").ok()?).ok()?.1;
    match params {
        Object::Array(array) => array.first().and_then(|o| resolve_dict(doc, o)),
        other => other.as_dict().ok(),
    }
}

fn int_entry(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    dict.get_deref(key, doc).ok().and_then(|o| o.as_i64().ok())
}

fn dimension(doc: &Document, dict: &Dictionary, key: &[u8]) -> Result<u32> {
    int_entry(doc, dict, key)
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
        .ok_or_else(|| {
            Error::ImageDecode(format!("bad /{}", String::from_utf8_lossy(key)))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::StringFormat;

    fn name(n: &str) -> Object {
        Object::Name(n.as_bytes().to_vec())
    }

    #[test]
    fn test_color_model_for_device_spaces() {
        let doc = Document::with_version("1.5");
        assert_eq!(
            color_model(&doc, &name("DeviceRGB")).unwrap(),
            ColorModel::Components(3)
        );
        assert_eq!(
            color_model(&doc, &name("DeviceCMYK")).unwrap(),
            ColorModel::Components(4)
        );
        assert!(color_model(&doc, &name("Separation")).is_err());
    }

    #[test]
    fn test_color_model_reads_icc_component_count() {
        let mut doc = Document::with_version("1.5");
        let profile = doc.add_object(Stream::new(lopdf::dictionary! { "N" => 1 }, vec![]));
        let space = Object::Array(vec![name("ICCBased"), profile.into()]);

        assert_eq!(color_model(&doc, &space).unwrap(), ColorModel::Components(1));
    }

    #[test]
    fn test_indexed_palette_expands_to_base_space() {
        let doc = Document::with_version("1.5");
        let space = Object::Array(vec![
            name("Indexed"),
            name("DeviceRGB"),
            1.into(),
            Object::String(vec![255, 0, 0, 0, 0, 255], StringFormat::Hexadecimal),
        ]);

        let model = color_model(&doc, &space).unwrap();
        let ColorModel::Indexed { base, hival, lookup } = model else {
            panic!("expected an indexed model");
        };
        assert_eq!(
            expand_palette(&[0, 1, 7], base, hival, &lookup),
            vec![255, 0, 0, 0, 0, 255, 0, 0, 255]
        );
    }

    #[test]
    fn test_indexed_rejects_short_lookup() {
        let doc = Document::with_version("1.5");
        let space = Object::Array(vec![
            name("Indexed"),
            name("DeviceRGB"),
            3.into(),
            Object::String(vec![0; 6], StringFormat::Literal),
        ]);
        assert!(color_model(&doc, &space).is_err());
    }
}
