//! Two-pass separable blur over a ping-pong pair.
//!
//! ```text
//! Init -> Horizontal{0} -> Vertical{0} -> Horizontal{1} -> ... -> Done
//! ```
//!
//! Round 0 reads the source surface; later rounds read the vertical result
//! of the round before. Horizontal passes write `ping`, vertical passes
//! write `pong`, so `pong` holds the image once `Done` is reached.

use tracing::{debug, info, trace};

use gblur_core::{BlurConfig, GaussianKernel, MIN_RADIUS, PackedKernel};

use crate::backend::{BlurAxis, GpuPrimitives, SurfaceHandle};
use crate::program::{BlurProgram, program_for};
use crate::GpuResult;

/// Position in the pass sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurState {
    /// Surfaces allocated, nothing drawn.
    Init,
    /// Next step draws the horizontal pass of `round`.
    Horizontal {
        /// Zero-based round.
        round: u32,
    },
    /// Next step draws the vertical pass of `round`.
    Vertical {
        /// Zero-based round.
        round: u32,
    },
    /// `pong` holds the result.
    Done,
}

/// Working surfaces, kernel and pass sequencing for one blur.
pub struct BlurPipeline<'a, P: GpuPrimitives> {
    prims: &'a P,
    program: Box<dyn BlurProgram>,
    kernel: GaussianKernel,
    packed: PackedKernel,
    ping: P::Surface,
    pong: P::Surface,
    rounds: u32,
    lod: f32,
    state: BlurState,
}

impl<'a, P: GpuPrimitives> BlurPipeline<'a, P> {
    /// Allocates the working pair for a `source_width` x `source_height`
    /// source and packs the configured kernel.
    pub fn new(prims: &'a P, config: &BlurConfig, source_width: u32, source_height: u32) -> GpuResult<Self> {
        let (width, height) = config.working_size(source_width, source_height);
        let ping = prims.allocate(width, height, false)?;
        let pong = prims.allocate(width, height, false)?;

        let program = program_for(config.layout);
        let kernel = config.build_kernel();
        let packed = program.pack(&kernel, [width as f32, height as f32]);
        debug!(
            width,
            height,
            layout = config.layout.name(),
            radius = kernel.radius(),
            weights = ?kernel.weights(),
            "blur pipeline allocated"
        );

        Ok(Self {
            prims,
            program,
            kernel,
            packed,
            ping,
            pong,
            rounds: config.rounds(),
            lod: config.source_lod,
            state: BlurState::Init,
        })
    }

    /// Rebuilds the kernel, keeping the surfaces.
    pub fn set_kernel(&mut self, radius: i32, sigma: f32) {
        self.kernel = GaussianKernel::build_bounded(radius, sigma, MIN_RADIUS, self.program.max_radius() as i32);
        let (w, h) = self.working_size();
        self.packed = self.program.pack(&self.kernel, [w as f32, h as f32]);
        self.state = BlurState::Init;
        debug!(radius = self.kernel.radius(), sigma = self.kernel.sigma(), "kernel rebuilt");
    }

    /// Sets the round count, at least 1.
    pub fn set_rounds(&mut self, rounds: u32) {
        self.rounds = rounds.max(1);
        self.state = BlurState::Init;
    }

    /// Kernel in use.
    pub fn kernel(&self) -> &GaussianKernel {
        &self.kernel
    }

    /// Rounds per run.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Current state.
    pub fn state(&self) -> BlurState {
        self.state
    }

    /// Size of both working surfaces.
    pub fn working_size(&self) -> (u32, u32) {
        self.ping.dimensions()
    }

    /// Draws the pass due in the current state and advances.
    ///
    /// A failed pass leaves the state unchanged.
    pub fn step(&mut self, source: &P::Surface) -> GpuResult<BlurState> {
        let next = match self.state {
            BlurState::Init => BlurState::Horizontal { round: 0 },
            BlurState::Horizontal { round } => {
                trace!(round, "horizontal pass");
                let src = if round == 0 { source } else { &self.pong };
                self.prims.exec_blur(src, &mut self.ping, BlurAxis::Horizontal, &self.packed, self.lod)?;
                BlurState::Vertical { round }
            }
            BlurState::Vertical { round } => {
                trace!(round, "vertical pass");
                self.prims.exec_blur(&self.ping, &mut self.pong, BlurAxis::Vertical, &self.packed, self.lod)?;
                if round + 1 < self.rounds {
                    BlurState::Horizontal { round: round + 1 }
                } else {
                    BlurState::Done
                }
            }
            BlurState::Done => BlurState::Done,
        };
        self.state = next;
        Ok(next)
    }

    /// Runs every round from the start and returns the blurred surface.
    pub fn run(&mut self, source: &P::Surface) -> GpuResult<&P::Surface> {
        self.state = BlurState::Init;
        while self.step(source)? != BlurState::Done {}
        info!(rounds = self.rounds, radius = self.kernel.radius(), "blur done");
        Ok(&self.pong)
    }

    /// Result of the last completed run.
    pub fn output(&self) -> &P::Surface {
        &self.pong
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuPrimitives;

    #[test]
    fn test_state_sequence() {
        let prims = CpuPrimitives::new();
        let config = BlurConfig { rounds: 2, ..Default::default() };
        let source = prims.upload(&[90u8; 16 * 16 * 4], 16, 16).unwrap();
        let mut blur = BlurPipeline::new(&prims, &config, 16, 16).unwrap();

        let mut states = vec![blur.state()];
        while blur.state() != BlurState::Done {
            states.push(blur.step(&source).unwrap());
        }
        assert_eq!(
            states,
            vec![
                BlurState::Init,
                BlurState::Horizontal { round: 0 },
                BlurState::Vertical { round: 0 },
                BlurState::Horizontal { round: 1 },
                BlurState::Vertical { round: 1 },
                BlurState::Done,
            ]
        );
        assert_eq!(blur.step(&source).unwrap(), BlurState::Done);
    }

    #[test]
    fn test_working_size_and_kernel_reuse() {
        let prims = CpuPrimitives::new();
        let mut blur = BlurPipeline::new(&prims, &BlurConfig::default(), 100, 60).unwrap();
        assert_eq!(blur.working_size(), (25, 15));
        assert_eq!(blur.kernel().radius(), 19);

        blur.set_kernel(8, 2.0);
        assert_eq!(blur.kernel().radius(), 9);
        assert_eq!(blur.working_size(), (25, 15));
        assert_eq!(blur.state(), BlurState::Init);

        blur.set_rounds(0);
        assert_eq!(blur.rounds(), 1);
    }
}
