//! Blend modes shared by the scene and every renderer.

/// How a drawable's premultiplied output combines with the target.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum BlendMode {
    #[default]
    Normal,
    Add,
    Multiply,
    Screen,
    /// Punches the source alpha out of the destination.
    Erase,
}

impl BlendMode {
    pub const ALL: [BlendMode; 5] = [
        BlendMode::Normal,
        BlendMode::Add,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Erase,
    ];

    /// Fixed-function blend state for premultiplied-alpha sources.
    pub fn to_wgpu(self) -> wgpu::BlendState {
        use wgpu::{BlendComponent, BlendFactor as F, BlendOperation as Op};

        let comp = |src, dst| BlendComponent {
            src_factor: src,
            dst_factor: dst,
            operation: Op::Add,
        };
        match self {
            BlendMode::Normal => wgpu::BlendState {
                color: comp(F::One, F::OneMinusSrcAlpha),
                alpha: comp(F::One, F::OneMinusSrcAlpha),
            },
            BlendMode::Add => wgpu::BlendState {
                color: comp(F::One, F::One),
                alpha: comp(F::One, F::One),
            },
            BlendMode::Multiply => wgpu::BlendState {
                color: comp(F::Dst, F::OneMinusSrcAlpha),
                alpha: comp(F::One, F::OneMinusSrcAlpha),
            },
            BlendMode::Screen => wgpu::BlendState {
                color: comp(F::One, F::OneMinusSrc),
                alpha: comp(F::One, F::OneMinusSrcAlpha),
            },
            BlendMode::Erase => wgpu::BlendState {
                color: comp(F::Zero, F::OneMinusSrcAlpha),
                alpha: comp(F::Zero, F::OneMinusSrcAlpha),
            },
        }
    }
}
