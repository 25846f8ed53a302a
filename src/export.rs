//! Audio and image files.
//!
//! WAV export is a small hand-written RIFF encoder so renders can be
//! produced in memory (for WASM) as easily as on disk. WAV import goes
//! through `hound`, with `symphonia` picking up 64-bit float files.
//! PNG export goes through `image`.

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

use crate::dsp::math::clamp;
use crate::error::SynthError;

const S24_FULL_SCALE: f64 = 8_388_607.0;

const FORMAT_PCM: u16 = 1;
const FORMAT_IEEE_FLOAT: u16 = 3;

/// Sample encoding of an exported WAV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WavFormat {
    /// 24-bit signed integer PCM; samples are clamped to [-1, 1].
    #[default]
    S24,
    /// 64-bit IEEE float, written unclamped.
    F64,
}

impl WavFormat {
    pub fn bits_per_sample(self) -> u16 {
        match self {
            WavFormat::S24 => 24,
            WavFormat::F64 => 64,
        }
    }
}

/// Encode mono samples to a WAV byte buffer.
pub fn encode_wav(samples: &[f64], sample_rate: u32, format: WavFormat) -> Vec<u8> {
    let bits_per_sample = format.bits_per_sample();
    let block_align = bits_per_sample / 8;
    let byte_rate = sample_rate * block_align as u32;
    let data_size = (samples.len() * block_align as usize) as u32;

    // Float files carry an 18-byte fmt chunk and a fact chunk
    let (format_tag, fmt_size, fact) = match format {
        WavFormat::S24 => (FORMAT_PCM, 16u32, false),
        WavFormat::F64 => (FORMAT_IEEE_FLOAT, 18u32, true),
    };
    let fact_size = if fact { 12 } else { 0 };
    let header_size = 12 + 8 + fmt_size + fact_size + 8;
    let file_size = header_size - 8 + data_size;

    let mut buf = Vec::with_capacity((header_size + data_size) as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&fmt_size.to_le_bytes());
    buf.extend_from_slice(&format_tag.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // mono
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());
    if fact {
        buf.extend_from_slice(&0u16.to_le_bytes()); // cbSize
        buf.extend_from_slice(b"fact");
        buf.extend_from_slice(&4u32.to_le_bytes());
        buf.extend_from_slice(&(samples.len() as u32).to_le_bytes());
    }

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    match format {
        WavFormat::S24 => {
            for &sample in samples {
                let v = (clamp(sample, -1.0, 1.0) * S24_FULL_SCALE) as i32;
                buf.extend_from_slice(&v.to_le_bytes()[..3]);
            }
        }
        WavFormat::F64 => {
            for &sample in samples {
                buf.extend_from_slice(&sample.to_le_bytes());
            }
        }
    }

    buf
}

/// Encode and write a mono WAV file.
pub fn write_wav<P: AsRef<Path>>(
    path: P,
    samples: &[f64],
    sample_rate: u32,
    format: WavFormat,
) -> Result<(), SynthError> {
    let bytes = encode_wav(samples, sample_rate, format);
    std::fs::write(path.as_ref(), &bytes)?;
    log::debug!(
        "Wrote {} ({} samples, {} Hz, {:?})",
        path.as_ref().display(),
        samples.len(),
        sample_rate,
        format
    );
    Ok(())
}

/// Decode a WAV stream to mono `f32` samples in [-1, 1] plus its sample
/// rate. Multi-channel input is averaged down to one channel.
///
/// Integer PCM and 32-bit float go through `hound`. Layouts `hound` rejects
/// (64-bit float, as written by [`WavFormat::F64`]) are retried with
/// `symphonia`; when both fail the `hound` error is returned.
pub fn decode_wav<R: Read>(mut reader: R) -> Result<(Vec<f32>, u32), SynthError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let decoded = decode_with_hound(Cursor::new(bytes.as_slice()));
    match decoded {
        Err(hound::Error::FormatError(reason)) => decode_with_symphonia(bytes).map_err(|e| {
            log::debug!("symphonia could not decode the stream either: {e}");
            SynthError::Wav(hound::Error::FormatError(reason))
        }),
        result => Ok(result?),
    }
}

fn downmix(interleaved: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved;
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

fn decode_with_hound<R: Read>(reader: R) -> Result<(Vec<f32>, u32), hound::Error> {
    let mut reader = hound::WavReader::new(reader)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok((downmix(interleaved, spec.channels as usize), spec.sample_rate))
}

fn decode_with_symphonia(bytes: Vec<u8>) -> Result<(Vec<f32>, u32), SymphoniaError> {
    let stream = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let mut hint = Hint::new();
    hint.with_extension("wav");

    let probed = get_probe().format(&hint, stream, &FormatOptions::default(), &MetadataOptions::default())?;
    let mut format = probed.format;

    let track = format.default_track().ok_or(SymphoniaError::Unsupported("no audio track"))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(SymphoniaError::Unsupported("unknown sample rate"))?;
    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut buffer: Option<SampleBuffer<f32>> = None;
    let mut mono = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder.decode(&packet)?;
        let channels = decoded.spec().channels.count();
        let interleaved = buffer.get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, *decoded.spec()));
        interleaved.copy_interleaved_ref(decoded);
        mono.extend(downmix(interleaved.samples().to_vec(), channels));
    }

    Ok((mono, sample_rate))
}

/// Read a WAV file as mono samples and its sample rate.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, u32), SynthError> {
    let file = File::open(path.as_ref())?;
    let (samples, sample_rate) = decode_wav(BufReader::new(file))?;
    log::debug!(
        "Read {} ({} samples, {} Hz)",
        path.as_ref().display(),
        samples.len(),
        sample_rate
    );
    Ok((samples, sample_rate))
}

/// Expand an 8-bit indexed framebuffer into RGBA pixels.
fn expand_palette(framebuffer: &[u8], palette: &[[u8; 4]], width: usize, height: usize) -> Result<Vec<u8>, SynthError> {
    if palette.is_empty() || palette.len() > 256 {
        return Err(SynthError::InvalidConfig(format!(
            "palette must hold 1 to 256 colours, got {}",
            palette.len()
        )));
    }
    if framebuffer.len() != width * height {
        return Err(SynthError::InvalidConfig(format!(
            "framebuffer holds {} pixels, expected {}x{}",
            framebuffer.len(),
            width,
            height
        )));
    }

    let mut rgba = Vec::with_capacity(framebuffer.len() * 4);
    for &index in framebuffer {
        let colour = palette.get(index as usize).ok_or_else(|| {
            SynthError::InvalidConfig(format!("palette index {index} out of range"))
        })?;
        rgba.extend_from_slice(colour);
    }
    Ok(rgba)
}

/// Encode an indexed framebuffer as PNG bytes.
pub fn encode_indexed_png(
    framebuffer: &[u8],
    palette: &[[u8; 4]],
    width: usize,
    height: usize,
) -> Result<Vec<u8>, SynthError> {
    let rgba = expand_palette(framebuffer, palette, width, height)?;
    let image = image::RgbaImage::from_raw(width as u32, height as u32, rgba)
        .ok_or_else(|| SynthError::InvalidConfig("framebuffer does not fit the image".into()))?;

    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}

/// Write an indexed framebuffer to a PNG file.
pub fn write_indexed_png<P: AsRef<Path>>(
    path: P,
    framebuffer: &[u8],
    palette: &[[u8; 4]],
    width: usize,
    height: usize,
) -> Result<(), SynthError> {
    let rgba = expand_palette(framebuffer, palette, width, height)?;
    image::save_buffer(
        path.as_ref(),
        &rgba,
        width as u32,
        height as u32,
        image::ColorType::Rgba8,
    )?;
    log::debug!("Wrote {} ({}x{})", path.as_ref().display(), width, height);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(buf: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([buf[at], buf[at + 1]])
    }

    fn u32_at(buf: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
    }

    #[test]
    fn s24_header_layout() {
        let wav = encode_wav(&[0.0; 100], 44100, WavFormat::S24);

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u32_at(&wav, 16), 16);
        assert_eq!(u16_at(&wav, 20), FORMAT_PCM);
        assert_eq!(u16_at(&wav, 22), 1);
        assert_eq!(u32_at(&wav, 24), 44100);
        assert_eq!(u32_at(&wav, 28), 44100 * 3);
        assert_eq!(u16_at(&wav, 32), 3);
        assert_eq!(u16_at(&wav, 34), 24);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 40), 300);
        assert_eq!(wav.len(), 44 + 300);
        assert_eq!(u32_at(&wav, 4) as usize, wav.len() - 8);
    }

    #[test]
    fn f64_header_layout() {
        let wav = encode_wav(&[0.25; 10], 48000, WavFormat::F64);

        assert_eq!(u32_at(&wav, 16), 18);
        assert_eq!(u16_at(&wav, 20), FORMAT_IEEE_FLOAT);
        assert_eq!(u32_at(&wav, 28), 48000 * 8);
        assert_eq!(u16_at(&wav, 34), 64);
        assert_eq!(u16_at(&wav, 36), 0);
        assert_eq!(&wav[38..42], b"fact");
        assert_eq!(u32_at(&wav, 46), 10);
        assert_eq!(&wav[50..54], b"data");
        assert_eq!(u32_at(&wav, 54), 80);
        assert_eq!(wav.len(), 58 + 80);
        assert_eq!(u32_at(&wav, 4) as usize, wav.len() - 8);

        let first = f64::from_le_bytes(wav[58..66].try_into().unwrap());
        assert_eq!(first, 0.25);
    }

    #[test]
    fn s24_samples_are_clamped_little_endian() {
        let wav = encode_wav(&[1.0, -1.0, 2.0, 0.5], 44100, WavFormat::S24);
        let data = &wav[44..];
        assert_eq!(&data[0..3], &[0xFF, 0xFF, 0x7F]);
        assert_eq!(&data[3..6], &[0x01, 0x00, 0x80]);
        assert_eq!(&data[6..9], &data[0..3]);
        // 0.5 * 8388607 truncates to 0x3FFFFF
        assert_eq!(&data[9..12], &[0xFF, 0xFF, 0x3F]);
    }

    #[test]
    fn s24_decodes_through_hound() {
        let samples: Vec<f64> = (0..1000).map(|i| ((i as f64) * 0.05).sin() * 0.8).collect();
        let wav = encode_wav(&samples, 22050, WavFormat::S24);

        let (decoded, rate) = decode_wav(Cursor::new(wav)).unwrap();
        assert_eq!(rate, 22050);
        assert_eq!(decoded.len(), samples.len());
        for (a, b) in samples.iter().zip(&decoded) {
            assert!((*a as f32 - b).abs() < 1e-5, "{a} vs {b}");
        }
    }

    #[test]
    fn stereo_is_downmixed() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut bytes = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
            for _ in 0..10 {
                writer.write_sample(16384i16).unwrap();
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }

        let (mono, rate) = decode_wav(Cursor::new(bytes)).unwrap();
        assert_eq!(rate, 8000);
        assert_eq!(mono.len(), 10);
        assert!(mono.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn f64_decodes_through_symphonia() {
        let mut samples: Vec<f64> = (0..3000).map(|i| ((i as f64) * 0.01).sin() * 0.8).collect();
        samples.push(1.5);
        let wav = encode_wav(&samples, 48000, WavFormat::F64);

        let (decoded, rate) = decode_wav(Cursor::new(wav)).unwrap();
        assert_eq!(rate, 48000);
        assert_eq!(decoded.len(), samples.len());
        for (a, b) in samples.iter().zip(&decoded) {
            assert!((*a as f32 - b).abs() < 1e-6, "{a} vs {b}");
        }
        // Float export is unclamped and so is the import
        assert_eq!(decoded[3000], 1.5);
    }

    #[test]
    fn garbage_is_a_wav_error() {
        let result = decode_wav(Cursor::new(b"not a wav file".to_vec()));
        assert!(matches!(result, Err(SynthError::Wav(_))));
    }

    #[test]
    fn png_round_trips_palette_colours() {
        let palette = [[0, 0, 0, 255], [255, 128, 0, 255]];
        let framebuffer = [0u8, 1, 1, 0, 1, 0];
        let png = encode_indexed_png(&framebuffer, &palette, 3, 2).unwrap();
        assert_eq!(&png[1..4], b"PNG");

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 128, 0, 255]);
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn png_rejects_bad_input() {
        let palette = [[0, 0, 0, 255]];
        assert!(encode_indexed_png(&[0, 0, 0], &palette, 2, 2).is_err());
        assert!(encode_indexed_png(&[0, 1, 0, 0], &palette, 2, 2).is_err());
        assert!(encode_indexed_png(&[0], &[], 1, 1).is_err());
    }
}
