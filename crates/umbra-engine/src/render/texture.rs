use slotmap::new_key_type;

use crate::versioned::{GpuSlot, Seen, Version};

use super::api::{FramebufferHandle, TextureDesc, TextureFilter, TextureHandle};

new_key_type! {
    /// Handle to a texture owned by a [`RenderContext`](super::RenderContext).
    pub struct TextureId;
}

/// Sampling options fixed at creation.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct TextureOptions {
    pub filter: TextureFilter,
    pub repeat: bool,
}

#[derive(Debug)]
pub(super) enum TextureSource {
    /// CPU-side RGBA8 pixels; `None` until the data arrives.
    Pixels {
        data: Option<Vec<u8>>,
        version: Version,
        uploaded: Seen,
    },
    /// Offscreen color target; contents come from draws, not uploads.
    Target { framebuffer: GpuSlot<FramebufferHandle> },
}

#[derive(Debug)]
pub(super) struct TextureResource {
    pub width: u32,
    pub height: u32,
    pub options: TextureOptions,
    pub source: TextureSource,
    pub gpu: GpuSlot<TextureHandle>,
    /// Unit currently holding this texture, if any.
    pub unit: Option<u32>,
    /// Render time of the last bind.
    pub last_used: u64,
}

impl TextureResource {
    pub fn image(width: u32, height: u32, options: TextureOptions, data: Option<Vec<u8>>) -> Self {
        Self {
            width,
            height,
            options,
            source: TextureSource::Pixels {
                data,
                version: Version::new(1),
                uploaded: Seen::never(),
            },
            gpu: GpuSlot::new(),
            unit: None,
            last_used: 0,
        }
    }

    pub fn target(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            options: TextureOptions::default(),
            source: TextureSource::Target { framebuffer: GpuSlot::new() },
            gpu: GpuSlot::new(),
            unit: None,
            last_used: 0,
        }
    }

    pub fn desc(&self) -> TextureDesc {
        TextureDesc {
            width: self.width,
            height: self.height,
            filter: self.options.filter,
            repeat: self.options.repeat,
        }
    }

    pub fn is_ready(&self) -> bool {
        match &self.source {
            TextureSource::Pixels { data, .. } => data.is_some(),
            TextureSource::Target { .. } => true,
        }
    }

    pub fn is_target(&self) -> bool {
        matches!(self.source, TextureSource::Target { .. })
    }

    /// `true` if the GPU copy is missing or older than the CPU pixels.
    pub fn needs_upload(&self, generation: u64) -> bool {
        match &self.source {
            TextureSource::Pixels { data: Some(_), version, uploaded } => {
                self.gpu.is_stale(generation) || uploaded.is_stale(*version)
            }
            _ => false,
        }
    }

    /// Forgets upload stamps so the next bind re-uploads everything.
    pub fn reset_stamps(&mut self) {
        self.unit = None;
        if let TextureSource::Pixels { uploaded, .. } = &mut self.source {
            uploaded.reset();
        }
    }
}

pub(super) fn expected_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}
