/*
 Copyright (c) 2023 clone206

 This file is part of wavconvolve

 wavconvolve is free software: you can redistribute it and/or modify it
 under the terms of the GNU General Public License as published by the
 Free Software Foundation, either version 3 of the License, or
 (at your option) any later version.

 wavconvolve is distributed in the hope that it will be useful, but
 WITHOUT ANY WARRANTY; without even the implied warranty of
 MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 GNU General Public License for more details.
 You should have received a copy of the GNU General Public License
 along with wavconvolve. If not, see <https://www.gnu.org/licenses/>.
*/

//! RIFF/WAVE reading and writing.
//!
//! A WAVE file is a `RIFF` record followed by tagged, length-prefixed
//! chunks. Only two of them matter here:
//!
//! - `fmt `: channel count, sample rate and bit depth.
//! - `data`: the interleaved little-endian PCM samples.
//!
//! Chunk tags are compared as big-endian `u32` values (equivalent to their
//! literal ASCII bytes); every other multi-byte field is little-endian.
//! All field access goes through an [`EndianAdapter`].

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};

use log::{debug, trace, warn};
use sampled_data_duration::ConstantRateDuration;

use crate::SampleBuffer;
use crate::endian::EndianAdapter;
use crate::error::Error;

/// `RIFF`
pub const RIFF_ID: u32 = 0x5249_4646;
/// `WAVE`
pub const WAVE_ID: u32 = 0x5741_5645;
/// `fmt `
pub const FMT_ID: u32 = 0x666d_7420;
/// `data`
pub const DATA_ID: u32 = 0x6461_7461;

/// Tag plus size field.
pub const CHUNK_HEADER_SIZE: u64 = 8;
/// Tag, size field and form type.
pub const RIFF_RECORD_SIZE: u64 = 12;
/// Payload size of a plain PCM fmt chunk.
pub const PCM_FMT_CHUNK_SIZE: u32 = 16;
/// Size of the header written by [`WavWriter`].
pub const HEADER_SIZE: u64 =
    RIFF_RECORD_SIZE + CHUNK_HEADER_SIZE + PCM_FMT_CHUNK_SIZE as u64 + CHUNK_HEADER_SIZE;

const WAVE_FORMAT_PCM: u16 = 1;
const WAVE_FORMAT_EXTENSIBLE: u16 = 0xfffe;

pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_CHANNELS: u16 = 1;

const PCM16_DECODE_GAIN: f64 = 1.0 / 32768.0;
const PCM16_ENCODE_GAIN: f64 = 32767.0;

/// Render a chunk tag for messages, escaping anything that isn't printable.
pub fn fourcc_to_string(tag: &[u8; 4]) -> String {
    tag.iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                (b as char).to_string()
            } else {
                format!("\\x{:02x}", b)
            }
        })
        .collect()
}

/// Read into `buf` until it is full or the stream ends.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// The tag and declared payload size that open every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: u32,
    pub size: u32,
}

impl ChunkHeader {
    /// Read a header at the current position. `None` at end of stream.
    pub fn read_from<R: Read>(
        reader: &mut R,
        adapter: EndianAdapter,
    ) -> io::Result<Option<ChunkHeader>> {
        let mut buffer = [0u8; CHUNK_HEADER_SIZE as usize];
        if read_up_to(reader, &mut buffer)? < buffer.len() {
            return Ok(None);
        }
        Ok(Some(ChunkHeader {
            id: adapter.read_big_u32([buffer[0], buffer[1], buffer[2], buffer[3]]),
            size: adapter.read_little_u32([buffer[4], buffer[5], buffer[6], buffer[7]]),
        }))
    }

    pub fn tag(&self) -> [u8; 4] {
        self.id.to_be_bytes()
    }
}

/// Location of a chunk found by [`find_chunk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLocation {
    /// Offset of the first payload byte.
    pub payload_offset: u64,
    /// Declared payload size.
    pub size: u32,
}

/// Scan `stream` from the start for the chunk tagged `id`.
///
/// Unknown chunks are skipped by their declared size. The top level `RIFF`
/// record is stepped over by its fixed 12 bytes so the scan descends into
/// the chunks it contains.
pub fn find_chunk<S: Read + Seek>(
    stream: &mut S,
    adapter: EndianAdapter,
    id: u32,
) -> Result<ChunkLocation, Error> {
    let mut pos: u64 = 0;
    loop {
        stream.seek(SeekFrom::Start(pos))?;
        let Some(header) = ChunkHeader::read_from(stream, adapter)? else {
            return Err(Error::ChunkNotFound(id.to_be_bytes()));
        };
        trace!(
            "Chunk '{}' at offset {}, {} bytes",
            fourcc_to_string(&header.tag()),
            pos,
            header.size
        );

        if header.id == id {
            return Ok(ChunkLocation {
                payload_offset: pos + CHUNK_HEADER_SIZE,
                size: header.size,
            });
        }

        pos += if header.id == RIFF_ID {
            RIFF_RECORD_SIZE
        } else {
            CHUNK_HEADER_SIZE + u64::from(header.size)
        };
    }
}

/// Sample encodings, each carrying its own conversion to and from `f32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleWidth {
    /// Signed 16 bit little-endian PCM.
    Pcm16,
    /// Declared in a fmt chunk but without a decoder.
    Unsupported { bits: u16 },
}

impl SampleWidth {
    pub fn from_bits(bits: u16) -> SampleWidth {
        match bits {
            16 => SampleWidth::Pcm16,
            _ => SampleWidth::Unsupported { bits },
        }
    }

    pub fn bits(&self) -> u16 {
        match self {
            SampleWidth::Pcm16 => 16,
            SampleWidth::Unsupported { bits } => *bits,
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits() / 8)
    }

    /// Convert raw sample bytes into `out`, one sample per
    /// [`bytes_per_sample`](Self::bytes_per_sample) bytes. Returns the
    /// number of samples written.
    pub fn decode(
        &self,
        adapter: EndianAdapter,
        raw: &[u8],
        out: &mut [f32],
    ) -> Result<usize, Error> {
        match self {
            SampleWidth::Pcm16 => {
                let mut count = 0;
                for (bytes, sample) in raw.chunks_exact(2).zip(out.iter_mut()) {
                    let value = adapter.read_little_i16([bytes[0], bytes[1]]);
                    *sample = (f64::from(value) * PCM16_DECODE_GAIN) as f32;
                    count += 1;
                }
                Ok(count)
            }
            SampleWidth::Unsupported { bits } => {
                Err(Error::UnsupportedSampleWidth { bits: *bits })
            }
        }
    }

    /// Append the encoded form of `samples` to `out`.
    ///
    /// Samples are scaled and rounded but not clamped: values outside
    /// `[-1.0, 1.0]` wrap around.
    pub fn encode(
        &self,
        adapter: EndianAdapter,
        samples: &[f32],
        out: &mut Vec<u8>,
    ) -> Result<(), Error> {
        match self {
            SampleWidth::Pcm16 => {
                out.reserve(samples.len() * 2);
                for &sample in samples {
                    let value = (f64::from(sample) * PCM16_ENCODE_GAIN).round() as i64 as i16;
                    out.extend_from_slice(&adapter.little_i16_bytes(value));
                }
                Ok(())
            }
            SampleWidth::Unsupported { bits } => {
                Err(Error::UnsupportedSampleWidth { bits: *bits })
            }
        }
    }
}

/// Format metadata bound to an open wav stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    pub channels: u16,
    pub sample_rate: u32,
    pub sample_width: SampleWidth,
    /// Sample count across all channels, not bytes.
    pub total_samples: u64,
    /// Offset of the first sample byte.
    pub data_start: u64,
}

impl WavSpec {
    pub fn bytes_per_sample(&self) -> usize {
        self.sample_width.bytes_per_sample()
    }

    /// Whole seconds of audio. Truncates, and treats every sample as a
    /// frame regardless of channel count.
    pub fn duration_seconds(&self) -> u64 {
        self.total_samples
            .checked_div(u64::from(self.sample_rate))
            .unwrap_or(0)
    }

    fn duration(&self) -> Option<ConstantRateDuration> {
        if self.sample_rate == 0 {
            return None;
        }
        Some(ConstantRateDuration::new(
            self.total_samples,
            u64::from(self.sample_rate),
        ))
    }
}

impl fmt::Display for WavSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Sample count = {}
Channel number = {}
Sampling frequency = {} Hz
Bytes per sample = {}
Duration = {:.2} s",
            self.total_samples,
            self.channels,
            self.sample_rate,
            self.bytes_per_sample(),
            self.duration_seconds() as f64,
        )?;
        if let Some(duration) = self.duration() {
            write!(f, "\nCalculated duration = {} h:min:s;samples", duration)?;
        }
        Ok(())
    }
}

/// Fields of a fmt chunk, host order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FmtChunk {
    format: u16,
    channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
}

impl FmtChunk {
    fn parse(buffer: &[u8; PCM_FMT_CHUNK_SIZE as usize], adapter: EndianAdapter) -> FmtChunk {
        let u16_at = |i: usize| adapter.read_little_u16([buffer[i], buffer[i + 1]]);
        let u32_at = |i: usize| {
            adapter.read_little_u32([buffer[i], buffer[i + 1], buffer[i + 2], buffer[i + 3]])
        };
        FmtChunk {
            format: u16_at(0),
            channels: u16_at(2),
            sample_rate: u32_at(4),
            byte_rate: u32_at(8),
            block_align: u16_at(12),
            bits_per_sample: u16_at(14),
        }
    }
}

/// Check the leading `RIFF`/`WAVE` record. The size field is not validated.
fn check_signature<R: Read + Seek>(stream: &mut R, adapter: EndianAdapter) -> Result<(), Error> {
    stream.seek(SeekFrom::Start(0))?;
    let mut riff = [0u8; RIFF_RECORD_SIZE as usize];
    if read_up_to(stream, &mut riff)? < riff.len() {
        return Err(Error::NotAContainer);
    }
    let riff_id = adapter.read_big_u32([riff[0], riff[1], riff[2], riff[3]]);
    let declared_size = adapter.read_little_u32([riff[4], riff[5], riff[6], riff[7]]);
    let form = adapter.read_big_u32([riff[8], riff[9], riff[10], riff[11]]);

    if riff_id != RIFF_ID || form != WAVE_ID {
        return Err(Error::NotAContainer);
    }
    trace!("RIFF record declares {} bytes", declared_size);
    Ok(())
}

/// Decoding side of a wav stream.
pub struct WavReader<R> {
    stream: R,
    spec: WavSpec,
    adapter: EndianAdapter,
}

impl<R: Read + Seek> WavReader<R> {
    /// Parse the headers of `stream` using the host byte order.
    pub fn open(stream: R) -> Result<WavReader<R>, Error> {
        WavReader::with_adapter(stream, EndianAdapter::native())
    }

    /// Parse the headers of `stream` with an explicit byte order adapter.
    ///
    /// # Errors
    ///
    /// [`Error::NotAContainer`] without a `RIFF`/`WAVE` record,
    /// [`Error::ChunkNotFound`] when the fmt or data chunk is missing,
    /// [`Error::UnsupportedSampleWidth`] for anything but 16 bit samples.
    pub fn with_adapter(mut stream: R, adapter: EndianAdapter) -> Result<WavReader<R>, Error> {
        check_signature(&mut stream, adapter)?;

        let fmt_location = find_chunk(&mut stream, adapter, FMT_ID)?;
        if fmt_location.size < PCM_FMT_CHUNK_SIZE {
            return Err(Error::MalformedFormat("chunk is shorter than 16 bytes"));
        }
        stream.seek(SeekFrom::Start(fmt_location.payload_offset))?;
        let mut fmt_buffer = [0u8; PCM_FMT_CHUNK_SIZE as usize];
        if read_up_to(&mut stream, &mut fmt_buffer)? < fmt_buffer.len() {
            return Err(Error::MalformedFormat("chunk is truncated"));
        }
        let fmt = FmtChunk::parse(&fmt_buffer, adapter);
        debug!("{:?}", fmt);

        if fmt.format != WAVE_FORMAT_PCM && fmt.format != WAVE_FORMAT_EXTENSIBLE {
            warn!(
                "fmt chunk declares format code {}; decoding as integer PCM",
                fmt.format
            );
        }

        let sample_width = SampleWidth::from_bits(fmt.bits_per_sample);
        if let SampleWidth::Unsupported { bits } = sample_width {
            return Err(Error::UnsupportedSampleWidth { bits });
        }
        if fmt.channels == 0 {
            return Err(Error::MalformedFormat("channel count is zero"));
        }
        if fmt.sample_rate == 0 {
            return Err(Error::MalformedFormat("sample rate is zero"));
        }

        let expected_align = u32::from(fmt.channels) * sample_width.bytes_per_sample() as u32;
        if u32::from(fmt.block_align) != expected_align
            || fmt.byte_rate != fmt.sample_rate.wrapping_mul(expected_align)
        {
            warn!(
                "fmt chunk block align {} / byte rate {} disagree with {} channels at {} Hz",
                fmt.block_align, fmt.byte_rate, fmt.channels, fmt.sample_rate
            );
        }

        let data_location = find_chunk(&mut stream, adapter, DATA_ID)?;
        let total_samples =
            u64::from(data_location.size) / sample_width.bytes_per_sample() as u64;

        let spec = WavSpec {
            channels: fmt.channels,
            sample_rate: fmt.sample_rate,
            sample_width,
            total_samples,
            data_start: data_location.payload_offset,
        };
        debug!(
            "Sample data: {} samples starting at offset {}",
            spec.total_samples, spec.data_start
        );

        Ok(WavReader {
            stream,
            spec,
            adapter,
        })
    }

    pub fn spec(&self) -> &WavSpec {
        &self.spec
    }

    /// Fill `buffer` with samples from the start of the data chunk.
    ///
    /// On a short read the samples that were available are still decoded
    /// into the front of `buffer`.
    pub fn read_samples(&mut self, buffer: &mut [f32]) -> Result<(), Error> {
        let bytes_per_sample = self.spec.bytes_per_sample();
        self.stream.seek(SeekFrom::Start(self.spec.data_start))?;

        let wanted = (buffer.len() * bytes_per_sample) as u64;
        let mut raw = Vec::new();
        (&mut self.stream).take(wanted).read_to_end(&mut raw)?;

        let available = raw.len() / bytes_per_sample;
        let decoded = self.spec.sample_width.decode(
            self.adapter,
            &raw[..available * bytes_per_sample],
            &mut buffer[..available],
        )?;

        if decoded < buffer.len() {
            return Err(Error::ShortRead {
                requested: buffer.len(),
                read: decoded,
            });
        }
        Ok(())
    }

    /// Decode every sample the data chunk declares.
    ///
    /// The buffer is sized by what the stream actually holds past
    /// `data_start`, so a header claiming more data than the file contains
    /// ends in [`Error::ShortRead`] rather than a huge allocation.
    pub fn read_all(&mut self) -> Result<SampleBuffer, Error> {
        let declared = self.spec.total_samples;
        let available = self.samples_available()?;
        let count = declared.min(available);
        trace!(
            "Data chunk declares {} samples, stream holds {}",
            declared, available
        );

        let mut buffer = vec![0.0f32; count as usize];
        self.read_samples(&mut buffer)?;
        if count < declared {
            return Err(Error::ShortRead {
                requested: usize::try_from(declared).unwrap_or(usize::MAX),
                read: buffer.len(),
            });
        }
        Ok(buffer)
    }

    /// Whole samples between `data_start` and the end of the stream.
    fn samples_available(&mut self) -> Result<u64, Error> {
        let end = self.stream.seek(SeekFrom::End(0))?;
        let bytes = end.saturating_sub(self.spec.data_start);
        Ok(bytes / self.spec.bytes_per_sample() as u64)
    }

    /// Give the underlying stream back.
    pub fn close(self) -> R {
        self.stream
    }
}

/// Encoding side of a wav stream.
///
/// Samples are written past a reserved header region; the header itself is
/// only written by [`finalize`](Self::finalize), once the payload size is
/// known.
pub struct WavWriter<W> {
    stream: W,
    spec: WavSpec,
    adapter: EndianAdapter,
}

impl<W: Write + Seek> WavWriter<W> {
    /// Mono, 44100 Hz, 16 bit.
    pub fn new(stream: W) -> WavWriter<W> {
        WavWriter::build(
            stream,
            DEFAULT_CHANNELS,
            DEFAULT_SAMPLE_RATE,
            EndianAdapter::native(),
        )
    }

    /// 16 bit output with the given channel count and sample rate.
    pub fn with_format(stream: W, channels: u16, sample_rate: u32) -> Result<WavWriter<W>, Error> {
        WavWriter::with_adapter(stream, channels, sample_rate, EndianAdapter::native())
    }

    pub fn with_adapter(
        stream: W,
        channels: u16,
        sample_rate: u32,
        adapter: EndianAdapter,
    ) -> Result<WavWriter<W>, Error> {
        if channels == 0 {
            return Err(Error::MalformedFormat("channel count is zero"));
        }
        if sample_rate == 0 {
            return Err(Error::MalformedFormat("sample rate is zero"));
        }
        Ok(WavWriter::build(stream, channels, sample_rate, adapter))
    }

    fn build(stream: W, channels: u16, sample_rate: u32, adapter: EndianAdapter) -> WavWriter<W> {
        WavWriter {
            stream,
            spec: WavSpec {
                channels,
                sample_rate,
                sample_width: SampleWidth::Pcm16,
                total_samples: 0,
                data_start: HEADER_SIZE,
            },
            adapter,
        }
    }

    pub fn spec(&self) -> &WavSpec {
        &self.spec
    }

    /// Append `samples` after those already written.
    ///
    /// `total_samples` grows by however many samples reached the stream,
    /// even when the write comes up short.
    pub fn write_samples(&mut self, samples: &[f32]) -> Result<(), Error> {
        let bytes_per_sample = self.spec.bytes_per_sample();
        let mut encoded = Vec::new();
        self.spec
            .sample_width
            .encode(self.adapter, samples, &mut encoded)?;

        let offset = self.spec.data_start + self.spec.total_samples * bytes_per_sample as u64;
        self.stream.seek(SeekFrom::Start(offset))?;

        let mut written = 0;
        while written < encoded.len() {
            match self.stream.write(&encoded[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WriteZero => break,
                Err(e) => {
                    self.spec.total_samples += (written / bytes_per_sample) as u64;
                    return Err(e.into());
                }
            }
        }

        let written_samples = written / bytes_per_sample;
        self.spec.total_samples += written_samples as u64;
        if written_samples < samples.len() {
            return Err(Error::ShortWrite {
                requested: samples.len(),
                written: written_samples,
            });
        }
        Ok(())
    }

    /// Write the headers now that the payload size is known, flush, and
    /// hand the stream back.
    pub fn finalize(mut self) -> Result<W, Error> {
        let mut file_size = self.stream.seek(SeekFrom::End(0))?.max(self.spec.data_start);
        if file_size % 2 == 1 {
            file_size += 1;
        }
        let riff_size = u32::try_from(file_size).map_err(|_| Error::FileTooLarge(file_size))?;
        let data_size = u32::try_from(file_size - self.spec.data_start)
            .map_err(|_| Error::FileTooLarge(file_size))?;

        let a = self.adapter;
        let channels = self.spec.channels;
        let sample_rate = self.spec.sample_rate;
        let bytes_per_sample = self.spec.bytes_per_sample() as u32;
        let block_align = u32::from(channels) * bytes_per_sample;

        let mut header: Vec<u8> = Vec::with_capacity(HEADER_SIZE as usize);
        // RIFF record
        header.extend_from_slice(&a.big_u32_bytes(RIFF_ID));
        header.extend_from_slice(&a.little_u32_bytes(riff_size));
        header.extend_from_slice(&a.big_u32_bytes(WAVE_ID));

        // fmt chunk
        header.extend_from_slice(&a.big_u32_bytes(FMT_ID));
        header.extend_from_slice(&a.little_u32_bytes(PCM_FMT_CHUNK_SIZE));
        header.extend_from_slice(&a.little_u16_bytes(WAVE_FORMAT_PCM));
        header.extend_from_slice(&a.little_u16_bytes(channels));
        header.extend_from_slice(&a.little_u32_bytes(sample_rate));
        header.extend_from_slice(&a.little_u32_bytes(sample_rate.wrapping_mul(block_align)));
        header.extend_from_slice(&a.little_u16_bytes(block_align as u16));
        header.extend_from_slice(&a.little_u16_bytes(self.spec.sample_width.bits()));

        // data chunk header
        header.extend_from_slice(&a.big_u32_bytes(DATA_ID));
        header.extend_from_slice(&a.little_u32_bytes(data_size));
        debug_assert_eq!(header.len() as u64, HEADER_SIZE);

        self.stream.seek(SeekFrom::Start(0))?;
        self.stream.write_all(&header)?;
        self.stream.flush()?;
        debug!(
            "Wrote wav header: {} bytes total, {} bytes of samples",
            riff_size, data_size
        );
        Ok(self.stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn fmt_payload(channels: u16, rate: u32, bits: u16) -> Vec<u8> {
        let align = channels * (bits / 8);
        let mut p = Vec::new();
        p.extend_from_slice(&1u16.to_le_bytes());
        p.extend_from_slice(&channels.to_le_bytes());
        p.extend_from_slice(&rate.to_le_bytes());
        p.extend_from_slice(&(rate * u32::from(align)).to_le_bytes());
        p.extend_from_slice(&align.to_le_bytes());
        p.extend_from_slice(&bits.to_le_bytes());
        p
    }

    fn chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut c = tag.to_vec();
        c.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        c.extend_from_slice(payload);
        c
    }

    fn riff(chunks: &[Vec<u8>]) -> Vec<u8> {
        let body: Vec<u8> = chunks.concat();
        let mut f = b"RIFF".to_vec();
        f.extend_from_slice(&(body.len() as u32 + 4).to_le_bytes());
        f.extend_from_slice(b"WAVE");
        f.extend_from_slice(&body);
        f
    }

    fn pcm16(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn opens_canonical_file() {
        let bytes = riff(&[
            chunk(b"fmt ", &fmt_payload(2, 48000, 16)),
            chunk(b"data", &pcm16(&[0, 16384, -32768, 32767])),
        ]);
        let mut reader = WavReader::open(Cursor::new(bytes)).unwrap();
        let spec = *reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(spec.sample_width, SampleWidth::Pcm16);
        assert_eq!(spec.bytes_per_sample(), 2);
        assert_eq!(spec.total_samples, 4);
        assert_eq!(spec.data_start, HEADER_SIZE);

        let samples = reader.read_all().unwrap();
        assert_eq!(samples, vec![0.0, 0.5, -1.0, 32767.0 / 32768.0]);
    }

    #[test]
    fn skips_unknown_chunks() {
        let bytes = riff(&[
            chunk(b"LIST", b"INFOISFT\x04\x00\x00\x00test"),
            chunk(b"fmt ", &fmt_payload(1, 22050, 16)),
            chunk(b"fact", &[0, 0, 0, 0]),
            chunk(b"data", &pcm16(&[-16384, 8192])),
        ]);
        let mut reader = WavReader::open(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_rate, 22050);
        assert_eq!(reader.spec().data_start, 12 + 8 + 16 + 8 + 16 + 8 + 4 + 8);
        assert_eq!(reader.read_all().unwrap(), vec![-0.5, 0.25]);
    }

    #[test]
    fn find_chunk_reports_payload_offset() {
        let bytes = riff(&[
            chunk(b"junk", &[0xaa; 10]),
            chunk(b"data", &pcm16(&[1, 2, 3])),
        ]);
        let mut cursor = Cursor::new(bytes);
        let adapter = EndianAdapter::native();
        let location = find_chunk(&mut cursor, adapter, DATA_ID).unwrap();
        assert_eq!(location.payload_offset, 12 + 18 + 8);
        assert_eq!(location.size, 6);

        match find_chunk(&mut cursor, adapter, FMT_ID) {
            Err(Error::ChunkNotFound(tag)) => assert_eq!(&tag, b"fmt "),
            other => panic!("expected ChunkNotFound, got {:?}", other.map(|l| l.size)),
        }
    }

    #[test]
    fn rejects_missing_signature() {
        let mut bytes = riff(&[
            chunk(b"fmt ", &fmt_payload(1, 44100, 16)),
            chunk(b"data", &pcm16(&[1])),
        ]);
        bytes[8..12].copy_from_slice(b"AVI ");
        assert!(matches!(
            WavReader::open(Cursor::new(bytes)),
            Err(Error::NotAContainer)
        ));

        assert!(matches!(
            WavReader::open(Cursor::new(b"RIFX\0\0\0\0WAVE".to_vec())),
            Err(Error::NotAContainer)
        ));
        assert!(matches!(
            WavReader::open(Cursor::new(b"RIFF".to_vec())),
            Err(Error::NotAContainer)
        ));
        assert!(matches!(
            WavReader::open(Cursor::new(Vec::new())),
            Err(Error::NotAContainer)
        ));
    }

    #[test]
    fn rejects_unsupported_widths() {
        for bits in [8u16, 24, 32] {
            let bytes = riff(&[
                chunk(b"fmt ", &fmt_payload(1, 44100, bits)),
                chunk(b"data", &[0; 12]),
            ]);
            match WavReader::open(Cursor::new(bytes)) {
                Err(Error::UnsupportedSampleWidth { bits: b }) => assert_eq!(b, bits),
                Err(e) => panic!("unexpected error {}", e),
                Ok(_) => panic!("{} bit input should be rejected", bits),
            }
        }
    }

    #[test]
    fn rejects_zero_rate_and_missing_data() {
        let bytes = riff(&[
            chunk(b"fmt ", &fmt_payload(1, 0, 16)),
            chunk(b"data", &pcm16(&[1])),
        ]);
        assert!(matches!(
            WavReader::open(Cursor::new(bytes)),
            Err(Error::MalformedFormat(_))
        ));

        let bytes = riff(&[chunk(b"fmt ", &fmt_payload(1, 44100, 16))]);
        match WavReader::open(Cursor::new(bytes)) {
            Err(Error::ChunkNotFound(tag)) => assert_eq!(&tag, b"data"),
            _ => panic!("expected a missing data chunk"),
        }

        let bytes = riff(&[chunk(b"fmt ", &[1, 0, 1, 0])]);
        assert!(matches!(
            WavReader::open(Cursor::new(bytes)),
            Err(Error::MalformedFormat(_))
        ));
    }

    #[test]
    fn short_read_keeps_available_samples() {
        let mut bytes = riff(&[chunk(b"fmt ", &fmt_payload(1, 8000, 16))]);
        // data chunk claims 10 samples, only 3 follow
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&20u32.to_le_bytes());
        bytes.extend_from_slice(&pcm16(&[16384, -16384, 0]));

        let mut reader = WavReader::open(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().total_samples, 10);

        let mut buffer = vec![9.0f32; 10];
        match reader.read_samples(&mut buffer) {
            Err(Error::ShortRead { requested, read }) => {
                assert_eq!(requested, 10);
                assert_eq!(read, 3);
            }
            _ => panic!("expected a short read"),
        }
        assert_eq!(&buffer[..4], &[0.5, -0.5, 0.0, 9.0]);
    }

    #[test]
    fn oversized_data_chunk_is_a_short_read() {
        let mut bytes = riff(&[chunk(b"fmt ", &fmt_payload(1, 44100, 16))]);
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&0xFFFF_FFFEu32.to_le_bytes());
        bytes.extend_from_slice(&pcm16(&[-16384]));

        let mut reader = WavReader::open(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().total_samples, 0x7FFF_FFFF);
        match reader.read_all() {
            Err(Error::ShortRead { requested, read }) => {
                assert_eq!(requested, 0x7FFF_FFFF);
                assert_eq!(read, 1);
            }
            other => panic!("expected a short read, got {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn read_all_stops_at_end_of_stream() {
        let mut bytes = riff(&[chunk(b"fmt ", &fmt_payload(1, 8000, 16))]);
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&8u32.to_le_bytes());
        // odd trailing byte is not a whole sample
        bytes.extend_from_slice(&[0x00, 0x40, 0x00, 0xc0, 0x7f]);

        let mut reader = WavReader::open(Cursor::new(bytes)).unwrap();
        match reader.read_all() {
            Err(Error::ShortRead { requested, read }) => {
                assert_eq!(requested, 4);
                assert_eq!(read, 2);
            }
            other => panic!("expected a short read, got {:?}", other),
        }
    }

    #[test]
    fn writer_round_trips_within_quantization() {
        let originals: Vec<f32> = (-32768i32..32768)
            .step_by(97)
            .map(|k| k as f32 / 32768.0)
            .collect();

        let mut writer = WavWriter::new(Cursor::new(Vec::new()));
        let (head, tail) = originals.split_at(originals.len() / 3);
        writer.write_samples(head).unwrap();
        writer.write_samples(tail).unwrap();
        assert_eq!(writer.spec().total_samples, originals.len() as u64);
        let bytes = writer.finalize().unwrap().into_inner();
        assert_eq!(bytes.len() as u64, HEADER_SIZE + 2 * originals.len() as u64);

        let mut reader = WavReader::open(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().channels, DEFAULT_CHANNELS);
        assert_eq!(reader.spec().sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(reader.spec().total_samples, originals.len() as u64);
        let decoded = reader.read_all().unwrap();
        for (orig, dec) in originals.iter().zip(decoded.iter()) {
            assert!(
                (orig - dec).abs() <= 1.0 / 32768.0 + f32::EPSILON,
                "{} decoded as {}",
                orig,
                dec
            );
        }
    }

    #[test]
    fn header_fields_are_little_endian() {
        let mut writer = WavWriter::with_format(Cursor::new(Vec::new()), 2, 48000).unwrap();
        writer.write_samples(&[0.5, -0.5, 0.0]).unwrap();
        let bytes = writer.finalize().unwrap().into_inner();

        assert_eq!(&bytes[0..4], b"RIFF");
        // 44 + 6 bytes of samples
        assert_eq!(&bytes[4..8], &50u32.to_le_bytes());
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(&bytes[16..20], &16u32.to_le_bytes());
        assert_eq!(&bytes[20..22], &1u16.to_le_bytes());
        assert_eq!(&bytes[22..24], &2u16.to_le_bytes());
        assert_eq!(&bytes[24..28], &48000u32.to_le_bytes());
        assert_eq!(&bytes[28..32], &(48000u32 * 4).to_le_bytes());
        assert_eq!(&bytes[32..34], &4u16.to_le_bytes());
        assert_eq!(&bytes[34..36], &16u16.to_le_bytes());
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(&bytes[40..44], &6u32.to_le_bytes());
        assert_eq!(&bytes[44..], &pcm16(&[16384, -16384, 0])[..]);
    }

    #[test]
    fn out_of_range_samples_wrap() {
        let mut writer = WavWriter::new(Cursor::new(Vec::new()));
        writer.write_samples(&[1.5, -1.5]).unwrap();
        let bytes = writer.finalize().unwrap().into_inner();
        // round(1.5 * 32767) = 49151 wraps to -16385
        assert_eq!(&bytes[44..], &pcm16(&[-16385, 16385])[..]);
    }

    #[test]
    fn empty_writer_still_produces_header() {
        let writer = WavWriter::new(Cursor::new(Vec::new()));
        let bytes = writer.finalize().unwrap().into_inner();
        assert_eq!(bytes.len() as u64, HEADER_SIZE);
        assert_eq!(&bytes[40..44], &0u32.to_le_bytes());

        let reader = WavReader::open(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().total_samples, 0);
    }

    #[test]
    fn writer_rejects_zero_format() {
        assert!(WavWriter::with_format(Cursor::new(Vec::new()), 0, 44100).is_err());
        assert!(WavWriter::with_format(Cursor::new(Vec::new()), 1, 0).is_err());
    }

    /// Accepts a fixed number of bytes, then refuses further writes.
    struct CappedWriter {
        inner: Cursor<Vec<u8>>,
        cap: u64,
    }

    impl Write for CappedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let room = self.cap.saturating_sub(self.inner.position()) as usize;
            let n = room.min(buf.len());
            self.inner.write(&buf[..n])
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for CappedWriter {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn short_write_counts_written_samples() {
        let stream = CappedWriter {
            inner: Cursor::new(Vec::new()),
            cap: HEADER_SIZE + 5,
        };
        let mut writer = WavWriter::new(stream);
        match writer.write_samples(&[0.1, 0.2, 0.3, 0.4]) {
            Err(Error::ShortWrite { requested, written }) => {
                assert_eq!(requested, 4);
                assert_eq!(written, 2);
            }
            _ => panic!("expected a short write"),
        }
        assert_eq!(writer.spec().total_samples, 2);
    }

    #[test]
    fn summary_truncates_duration() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 44100,
            sample_width: SampleWidth::Pcm16,
            total_samples: 44100 * 3 + 44099,
            data_start: HEADER_SIZE,
        };
        assert_eq!(spec.duration_seconds(), 3);
        let text = spec.to_string();
        assert!(text.contains("Duration = 3.00 s"), "{}", text);
        assert!(text.contains("Sample count = 176399"), "{}", text);
    }

    #[test]
    fn fourcc_rendering_escapes_binary() {
        assert_eq!(fourcc_to_string(b"fmt "), "fmt ");
        assert_eq!(fourcc_to_string(&[0x64, 0x00, 0x74, 0xff]), "d\\x00t\\xff");
    }
}
