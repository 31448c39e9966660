//! WAV encoding and decoding.

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use binrw::{BinRead, BinReaderExt};
use bg_ir::{AudioBuffer, MAX_CHANNELS};

use crate::FormatError;

const FORMAT_PCM: u16 = 1;
const FORMAT_FLOAT: u16 = 3;
const FORMAT_EXTENSIBLE: u16 = 0xFFFE;
/// Offset of the sub-format tag inside an extensible `fmt ` chunk.
const SUBFORMAT_OFFSET: u64 = 24;

// --- Writing ---

/// Write `buffer` as interleaved 16-bit PCM with its own channel count and
/// sample rate. Samples are clamped to `[-1, 1]`.
pub fn write_wav(w: &mut impl Write, buffer: &AudioBuffer) -> Result<(), FormatError> {
    let num_channels = buffer.channels();
    let bits_per_sample: u16 = 16;
    let block_align = num_channels * (bits_per_sample / 8);
    let data_size = u32::try_from(buffer.frames() as u64 * block_align as u64)
        .ok()
        .filter(|size| *size <= u32::MAX - 36)
        .ok_or(FormatError::Unsupported)?;

    write_riff_header(w, data_size)?;
    write_fmt_chunk(w, num_channels, buffer.sample_rate(), block_align, bits_per_sample)?;
    write_data_chunk(w, buffer, data_size)?;
    Ok(())
}

/// Encode `buffer` into an in-memory WAV file.
pub fn buffer_to_wav(buffer: &AudioBuffer) -> Result<Vec<u8>, FormatError> {
    let mut buf = Vec::with_capacity(44 + buffer.frames() * buffer.channels() as usize * 2);
    write_wav(&mut buf, buffer)?;
    Ok(buf)
}

/// Write `buffer` to a WAV file at `path`.
pub fn save_wav_file(path: impl AsRef<Path>, buffer: &AudioBuffer) -> Result<(), FormatError> {
    let bytes = buffer_to_wav(buffer)?;
    fs::write(path, bytes)?;
    Ok(())
}

fn write_riff_header(w: &mut impl Write, data_size: u32) -> std::io::Result<()> {
    w.write_all(b"RIFF")?;
    w.write_all(&(36 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")
}

fn write_fmt_chunk(
    w: &mut impl Write,
    num_channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
) -> std::io::Result<()> {
    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&FORMAT_PCM.to_le_bytes())?;
    w.write_all(&num_channels.to_le_bytes())?;
    w.write_all(&sample_rate.to_le_bytes())?;
    w.write_all(&(sample_rate * block_align as u32).to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&bits_per_sample.to_le_bytes())
}

fn write_data_chunk(w: &mut impl Write, buffer: &AudioBuffer, data_size: u32) -> std::io::Result<()> {
    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    let mut frame = Vec::with_capacity(buffer.channels() as usize * 2);
    for i in 0..buffer.frames() {
        frame.clear();
        for ch in 0..buffer.channels() {
            frame.extend_from_slice(&sample_to_i16(buffer.channel(ch)[i]).to_le_bytes());
        }
        w.write_all(&frame)?;
    }
    Ok(())
}

/// Negative samples scale by 0x8000, positive by 0x7FFF.
fn sample_to_i16(s: f32) -> i16 {
    let s = s.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

// --- Reading ---

#[derive(BinRead)]
#[br(little, magic = b"RIFF")]
struct RiffHeader {
    _size: u32,
    form: [u8; 4],
}

#[derive(BinRead)]
#[br(little)]
struct ChunkHeader {
    id: [u8; 4],
    size: u32,
}

#[derive(BinRead)]
#[br(little)]
struct FmtChunk {
    format: u16,
    channels: u16,
    sample_rate: u32,
    _byte_rate: u32,
    _block_align: u16,
    bits_per_sample: u16,
}

/// Decode a WAV file into a planar buffer at the file's sample rate.
///
/// Handles 8/16/24/32-bit integer PCM and 32-bit float, including the
/// extensible `fmt ` layout. Unknown chunks are skipped; a data chunk that
/// runs past the end of the file is read up to the last whole frame.
pub fn load_wav(data: &[u8]) -> Result<AudioBuffer, FormatError> {
    let mut cursor = Cursor::new(data);
    let riff = RiffHeader::read(&mut cursor).map_err(header_error)?;
    if &riff.form != b"WAVE" {
        return Err(FormatError::InvalidHeader);
    }

    let mut fmt: Option<FmtChunk> = None;
    let mut pcm: Option<&[u8]> = None;
    while cursor.position() as usize + 8 <= data.len() {
        let chunk = ChunkHeader::read(&mut cursor).map_err(header_error)?;
        let body = cursor.position();
        let size = chunk.size as u64;
        match &chunk.id {
            b"fmt " => {
                let mut f = FmtChunk::read(&mut cursor).map_err(header_error)?;
                if f.format == FORMAT_EXTENSIBLE && size >= SUBFORMAT_OFFSET + 2 {
                    cursor.set_position(body + SUBFORMAT_OFFSET);
                    f.format = cursor.read_le::<u16>().map_err(header_error)?;
                }
                fmt = Some(f);
            }
            b"data" => {
                let start = body as usize;
                let end = (start + chunk.size as usize).min(data.len());
                pcm = Some(&data[start..end]);
            }
            _ => {}
        }
        // Chunks are word aligned.
        cursor.set_position(body + size + (size & 1));
    }

    let fmt = fmt.ok_or(FormatError::InvalidHeader)?;
    let pcm = pcm.ok_or(FormatError::InvalidHeader)?;
    decode(&fmt, pcm)
}

/// Read and decode the WAV file at `path`.
pub fn load_wav_file(path: impl AsRef<Path>) -> Result<AudioBuffer, FormatError> {
    let data = fs::read(path)?;
    load_wav(&data)
}

fn header_error(e: binrw::Error) -> FormatError {
    if e.is_eof() {
        FormatError::UnexpectedEof
    } else {
        match e {
            binrw::Error::Io(io) => FormatError::from(io),
            _ => FormatError::InvalidHeader,
        }
    }
}

fn decode(fmt: &FmtChunk, raw: &[u8]) -> Result<AudioBuffer, FormatError> {
    if fmt.channels == 0 || fmt.channels > MAX_CHANNELS || fmt.sample_rate == 0 {
        return Err(FormatError::Unsupported);
    }
    let convert: fn(&[u8]) -> f32 = match (fmt.format, fmt.bits_per_sample) {
        (FORMAT_PCM, 8) => |b| (b[0] as f32 - 128.0) / 128.0,
        (FORMAT_PCM, 16) => |b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0,
        (FORMAT_PCM, 24) => |b| (i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8) as f32 / 8_388_608.0,
        (FORMAT_PCM, 32) => |b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f32 / 2_147_483_648.0,
        (FORMAT_FLOAT, 32) => |b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        _ => return Err(FormatError::Unsupported),
    };
    let width = fmt.bits_per_sample as usize / 8;
    let channels = fmt.channels as usize;
    let frames = raw.len() / (width * channels);

    let mut planes = vec![Vec::with_capacity(frames); channels];
    for frame in raw.chunks_exact(width * channels) {
        for (plane, sample) in planes.iter_mut().zip(frame.chunks_exact(width)) {
            plane.push(convert(sample));
        }
    }
    Ok(AudioBuffer::from_planes(planes, fmt.sample_rate))
}
