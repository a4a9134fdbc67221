//! FM Operator and the stack renderers.

// Based on MIT-licensed code (c) 2021 by Emilie Gillet (emilie.o.gillet@gmail.com)

use core::f32::consts::TAU;

#[allow(unused_imports)]
use num_traits::float::Float;

/// Maximum number of operators chained in a single stack.
pub const MAX_STACK_SIZE: usize = 4;

/// Gain ceiling of an operator.
const MAX_AMPLITUDE: f32 = 4.0;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Operator {
    /// Phase in cycles, wrapped to `[0, 1)`.
    pub phase: f32,
    pub amplitude: f32,
}

impl Operator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.amplitude = 0.0;
    }
}

/// Where the first operator of a stack gets its phase modulation from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModulationSource {
    /// Output of a previously rendered stack.
    External,
    /// Unmodulated.
    None,
    /// The stack's own output, taken at the given chain position.
    Feedback(u8),
}

impl ModulationSource {
    pub const COUNT: usize = 2 + MAX_STACK_SIZE;

    /// Position in the renderer table. This is the `MODULATION_SOURCE`
    /// parameter of [`render_operators`] plus 2.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::External => 0,
            Self::None => 1,
            Self::Feedback(position) => 2 + position as usize,
        }
    }
}

const SOURCE_EXTERNAL: i32 = -2;
const SOURCE_NONE: i32 = -1;

pub type RenderFn = fn(
    ops: &mut [Operator],
    f: &[f32],
    a: &[f32],
    fb_state: &mut [f32; 2],
    fb_amount: u8,
    modulation: &[f32],
    out: &mut [f32],
);

/// Renders a chain of `N` operators, operator `i` modulating operator `i + 1`,
/// the last one writing to `out`.
///
/// `MODULATION_SOURCE` is -2 for the external `modulation` buffer, -1 for
/// none, or the chain position whose output is fed back to the first
/// operator through the two-sample feedback memory.
#[allow(clippy::too_many_arguments)]
pub fn render_operators<const N: usize, const MODULATION_SOURCE: i32, const ADDITIVE: bool>(
    ops: &mut [Operator],
    f: &[f32],
    a: &[f32],
    fb_state: &mut [f32; 2],
    fb_amount: u8,
    modulation: &[f32],
    out: &mut [f32],
) {
    let mut frequency = [0.0; N];
    let mut phase = [0.0; N];
    let mut amplitude = [0.0; N];
    let mut amplitude_increment = [0.0; N];

    let scale = 1.0 / out.len() as f32;

    for i in 0..N {
        frequency[i] = f32::min(f[i], 0.5);
        phase[i] = ops[i].phase;
        amplitude[i] = ops[i].amplitude;
        amplitude_increment[i] = (f32::min(a[i], MAX_AMPLITUDE) - amplitude[i]) * scale;
    }

    let fb_scale = if fb_amount != 0 {
        (1 << fb_amount) as f32 / 512.0
    } else {
        0.0
    };

    let [mut previous_0, mut previous_1] = *fb_state;

    for (i, out_sample) in out.iter_mut().enumerate() {
        let mut pm = match MODULATION_SOURCE {
            SOURCE_EXTERNAL => modulation[i],
            SOURCE_NONE => 0.0,
            _ => (previous_0 + previous_1) * fb_scale,
        };

        for j in 0..N {
            phase[j] += frequency[j];
            if phase[j] >= 1.0 {
                phase[j] -= 1.0;
            }
            pm = (TAU * (phase[j] + pm)).sin() * amplitude[j];
            amplitude[j] += amplitude_increment[j];
            if j as i32 == MODULATION_SOURCE {
                previous_1 = previous_0;
                previous_0 = pm;
            }
        }

        if ADDITIVE {
            *out_sample += pm;
        } else {
            *out_sample = pm;
        }
    }

    for i in 0..N {
        ops[i].phase = phase[i];
        ops[i].amplitude = amplitude[i];
    }

    if MODULATION_SOURCE >= 0 {
        *fb_state = [previous_0, previous_1];
    }
}

const fn renderers_for<const N: usize>() -> [[RenderFn; 2]; ModulationSource::COUNT] {
    [
        [
            render_operators::<N, SOURCE_EXTERNAL, false>,
            render_operators::<N, SOURCE_EXTERNAL, true>,
        ],
        [
            render_operators::<N, SOURCE_NONE, false>,
            render_operators::<N, SOURCE_NONE, true>,
        ],
        [
            render_operators::<N, 0, false>,
            render_operators::<N, 0, true>,
        ],
        [
            render_operators::<N, 1, false>,
            render_operators::<N, 1, true>,
        ],
        [
            render_operators::<N, 2, false>,
            render_operators::<N, 2, true>,
        ],
        [
            render_operators::<N, 3, false>,
            render_operators::<N, 3, true>,
        ],
    ]
}

/// Every renderer, indexed by stack size minus one, modulation source and
/// additive flag.
static RENDERERS: [[[RenderFn; 2]; ModulationSource::COUNT]; MAX_STACK_SIZE] = [
    renderers_for::<1>(),
    renderers_for::<2>(),
    renderers_for::<3>(),
    renderers_for::<4>(),
];

/// Looks up the renderer of a stack. Sizes outside `1..=4` have none.
#[inline]
pub fn renderer(n: usize, source: ModulationSource, additive: bool) -> Option<RenderFn> {
    let by_source = RENDERERS.get(n.checked_sub(1)?)?;
    let by_additive = by_source.get(source.index())?;

    Some(by_additive[additive as usize])
}
