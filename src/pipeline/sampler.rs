use std::{
    fs::File,
    io::{BufRead, BufReader, Seek},
    path::Path,
};

use anyhow::{Context, Result, anyhow, bail};
use image::{
    AnimationDecoder, ImageDecoder, ImageFormat, ImageReader, Limits,
    codecs::{gif::GifDecoder, png::PngDecoder, webp::WebPDecoder},
};

use super::decode::{frame_from_rgb, frame_from_rgba};
use crate::{
    config::{MAX_FRAMES, MAX_VIDEO_FRAME_PIXELS},
    types::Frame,
};

/// Sequential, non-restartable frame stream.
pub trait VideoSource {
    /// Next frame, or `Ok(None)` once the stream is exhausted.
    fn read_frame(&mut self) -> Result<Option<Frame>>;
}

/// Reads a strict prefix of a video, at most `max_frames` long.
#[derive(Clone, Debug)]
pub struct FrameSampler {
    max_frames: usize,
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self {
            max_frames: MAX_FRAMES,
        }
    }
}

impl FrameSampler {
    pub fn new(max_frames: usize) -> Self {
        Self { max_frames }
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// A failed read ends the sample the same way end-of-stream does.
    pub fn sample(&self, source: &mut dyn VideoSource) -> Vec<Frame> {
        let mut frames = Vec::with_capacity(self.max_frames.min(MAX_FRAMES));
        while frames.len() < self.max_frames {
            match source.read_frame() {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                Err(err) => {
                    log::warn!(
                        "video frame read failed after {} frames: {err:?}",
                        frames.len()
                    );
                    break;
                }
            }
        }
        frames
    }
}

/// Picks a decoder for the file at `path` by sniffing its contents.
///
/// Still images in any format `image` reads play as a one-frame clip.
pub fn open_video(path: &Path) -> Result<Box<dyn VideoSource>> {
    let mut reader = ImageReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("failed to read {}", path.display()))?;

    match reader.format() {
        Some(format @ (ImageFormat::Gif | ImageFormat::Png | ImageFormat::WebP)) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            Ok(Box::new(AnimationSource::new(BufReader::new(file), format)?))
        }
        Some(format) if format.reading_enabled() => {
            reader.limits(Limits::default());
            let image = reader
                .decode()
                .with_context(|| format!("invalid {format:?} image"))?;
            Ok(Box::new(AnimationSource::still(frame_from_rgb(
                &image.to_rgb8(),
            ))))
        }
        _ => open_container(path),
    }
}

#[cfg(feature = "video-opencv")]
fn open_container(path: &Path) -> Result<Box<dyn VideoSource>> {
    Ok(Box::new(super::opencv_video::OpenCvSource::open(path)?))
}

#[cfg(not(feature = "video-opencv"))]
fn open_container(path: &Path) -> Result<Box<dyn VideoSource>> {
    Err(anyhow!(
        "{} is not an animated image; video containers need the `video-opencv` feature",
        path.display()
    ))
}

/// Animated GIF, APNG or WebP, or a still image played as a single frame.
///
/// Animated canvases above [`MAX_VIDEO_FRAME_PIXELS`] are refused before any
/// frame is composited.
pub struct AnimationSource {
    inner: AnimationInner,
}

enum AnimationInner {
    Frames(image::Frames<'static>),
    Still(Option<Frame>),
}

impl AnimationSource {
    pub fn new<R>(reader: R, format: ImageFormat) -> Result<Self>
    where
        R: BufRead + Seek + 'static,
    {
        let inner = match format {
            ImageFormat::Gif => AnimationInner::Frames(
                limited(GifDecoder::new(reader).context("invalid GIF")?)?.into_frames(),
            ),
            ImageFormat::Png => {
                let mut decoder = PngDecoder::new(reader).context("invalid PNG")?;
                if decoder.is_apng().context("invalid PNG")? {
                    decoder = limited(decoder)?;
                    AnimationInner::Frames(decoder.apng().context("invalid APNG")?.into_frames())
                } else {
                    decoder
                        .set_limits(Limits::default())
                        .context("PNG exceeds decoder limits")?;
                    let image = image::DynamicImage::from_decoder(decoder)
                        .context("invalid PNG")?
                        .to_rgb8();
                    AnimationInner::Still(Some(frame_from_rgb(&image)))
                }
            }
            ImageFormat::WebP => AnimationInner::Frames(
                limited(WebPDecoder::new(reader).context("invalid WebP")?)?.into_frames(),
            ),
            other => return Err(anyhow!("{other:?} is not an animation format")),
        };
        Ok(Self { inner })
    }

    pub fn still(frame: Frame) -> Self {
        Self {
            inner: AnimationInner::Still(Some(frame)),
        }
    }
}

fn limited<D: ImageDecoder>(mut decoder: D) -> Result<D> {
    let (width, height) = decoder.dimensions();
    if u64::from(width) * u64::from(height) > MAX_VIDEO_FRAME_PIXELS {
        bail!("{width}x{height} animation exceeds {MAX_VIDEO_FRAME_PIXELS} pixels per frame");
    }
    decoder
        .set_limits(Limits::default())
        .context("animation exceeds decoder limits")?;
    Ok(decoder)
}

impl VideoSource for AnimationSource {
    fn read_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.inner {
            AnimationInner::Frames(frames) => match frames.next() {
                Some(Ok(frame)) => {
                    let buffer = frame.into_buffer();
                    Ok(Some(frame_from_rgba(
                        buffer.as_raw(),
                        buffer.width(),
                        buffer.height(),
                    )))
                }
                Some(Err(err)) => Err(err).context("failed to decode animation frame"),
                None => Ok(None),
            },
            AnimationInner::Still(frame) => Ok(frame.take()),
        }
    }
}
