//! FM Algorithms and how to render them.
//!
//! The raw structure of each algorithm is stored as the sequence of its
//! "stacks". A stack is a run of consecutive operators, each one phase
//! modulating the next, the last one writing to an output bus. The first
//! operator of a stack takes its modulation from nothing, from the feedback
//! memory, or from a bus written by earlier stacks.
//!
//! At first use, this data is "compiled" into a table of calls to renderers
//! specialized for the size, modulation source and output mode of each
//! stack. The compiled tables are process-wide and never change afterwards.

// Based on MIT-licensed code (c) 2021 by Emilie Gillet (emilie.o.gillet@gmail.com)

use spin::Once;

use super::operator::{renderer, ModulationSource, RenderFn};
use crate::Error;

/// Signal bus a stack reads from or writes to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Bus {
    /// Audio output of the voice.
    #[default]
    Output,
    /// Scratch buffer carrying modulation between stacks.
    Scratch,
}

/// Raw description of one stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stack {
    pub n: usize,
    pub source: ModulationSource,
    pub additive: bool,
    pub input: Bus,
    pub output: Bus,
}

const fn stack(n: usize, source: i8, additive: bool, input: u8, output: u8) -> Stack {
    Stack {
        n,
        source: match source {
            -2 => ModulationSource::External,
            -1 => ModulationSource::None,
            position => ModulationSource::Feedback(position as u8),
        },
        additive,
        input: if input == 0 { Bus::Output } else { Bus::Scratch },
        output: if output == 0 { Bus::Output } else { Bus::Scratch },
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RenderCall {
    pub render_fn: Option<RenderFn>,
    pub n: usize,
    pub input: Bus,
    pub output: Bus,
    pub source: Option<ModulationSource>,
}

/// Set of operators whose output modulates another operator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Modulators(u8);

impl Modulators {
    #[inline]
    pub fn bits(&self) -> u8 {
        self.0
    }

    #[inline]
    pub fn contains(&self, op: usize) -> bool {
        op < 8 && self.0 & (1 << op) != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..8).filter(|&op| self.contains(op))
    }

    fn insert(&mut self, op: usize) {
        self.0 |= 1 << op;
    }
}

#[derive(Debug, Clone)]
pub struct Algorithm<const NUM_OPERATORS: usize> {
    render_call: [RenderCall; NUM_OPERATORS],
    modulators: Modulators,
}

impl<const NUM_OPERATORS: usize> Algorithm<NUM_OPERATORS> {
    fn compile(stacks: &[Stack]) -> Self {
        let mut render_call = [RenderCall::default(); NUM_OPERATORS];
        let mut modulators = Modulators::default();
        let mut from = 0;

        for stack in stacks {
            let to = from + stack.n - 1;

            for op in from..=usize::min(to, NUM_OPERATORS - 1) {
                // An operator feeding the scratch bus modulates a later stack.
                if stack.output == Bus::Scratch || op < to {
                    modulators.insert(op);
                }
            }

            if let Some(call) = render_call.get_mut(from) {
                *call = RenderCall {
                    render_fn: renderer(stack.n, stack.source, stack.additive),
                    n: stack.n,
                    input: stack.input,
                    output: stack.output,
                    source: Some(stack.source),
                };
            }

            from += stack.n;
        }

        Self {
            render_call,
            modulators,
        }
    }

    /// Iterates over the stacks, with the index of their first operator.
    pub fn stacks(&self) -> impl Iterator<Item = (usize, &RenderCall)> + '_ {
        let mut i = 0;

        core::iter::from_fn(move || {
            let call = self.render_call.get(i)?;
            let first = i;
            i += usize::max(call.n, 1);
            Some((first, call))
        })
    }

    #[inline]
    pub fn modulators(&self) -> Modulators {
        self.modulators
    }
}

#[derive(Debug, Clone)]
pub struct Algorithms<const NUM_OPERATORS: usize, const NUM_ALGORITHMS: usize> {
    algorithms: [Algorithm<NUM_OPERATORS>; NUM_ALGORITHMS],
}

static DX7: Once<Algorithms<6, 32>> = Once::new();
static DX100: Once<Algorithms<4, 8>> = Once::new();

impl Algorithms<6, 32> {
    /// The 32 algorithms of the six operator chip.
    pub fn dx7() -> &'static Self {
        DX7.call_once(|| Self::compile(&DX7_ALGORITHMS))
    }
}

impl Algorithms<4, 8> {
    /// The 8 algorithms of the legacy four operator chip.
    pub fn dx100() -> &'static Self {
        DX100.call_once(|| Self::compile(&DX100_ALGORITHMS))
    }
}

impl<const NUM_OPERATORS: usize, const NUM_ALGORITHMS: usize>
    Algorithms<NUM_OPERATORS, NUM_ALGORITHMS>
{
    pub fn compile(table: &[&[Stack]; NUM_ALGORITHMS]) -> Self {
        Self {
            algorithms: core::array::from_fn(|i| Algorithm::compile(table[i])),
        }
    }

    pub fn get(&self, index: usize) -> Result<&Algorithm<NUM_OPERATORS>, Error> {
        self.algorithms.get(index).ok_or(Error::UnknownAlgorithm {
            index,
            count: NUM_ALGORITHMS,
        })
    }

    /// Algorithm for a decoded patch index. Indices beyond the table wrap
    /// around.
    #[inline]
    pub fn for_patch(&self, index: u8) -> &Algorithm<NUM_OPERATORS> {
        &self.algorithms[index as usize % NUM_ALGORITHMS]
    }
}

pub const DX7_ALGORITHMS: [&[Stack]; 32] = [
    // Algorithm 1
    &[stack(4, 0, true, 0, 0), stack(2, -1, true, 0, 0)],
    // Algorithm 2
    &[stack(4, -1, true, 0, 0), stack(2, 0, true, 0, 0)],
    // Algorithm 3
    &[stack(3, 0, true, 0, 0), stack(3, -1, true, 0, 0)],
    // Algorithm 4
    &[stack(3, 2, true, 0, 0), stack(3, -1, true, 0, 0)],
    // Algorithm 5
    &[
        stack(2, 0, true, 0, 0),
        stack(2, -1, true, 0, 0),
        stack(2, -1, true, 0, 0),
    ],
    // Algorithm 6
    &[
        stack(2, 1, true, 0, 0),
        stack(2, -1, true, 0, 0),
        stack(2, -1, true, 0, 0),
    ],
    // Algorithm 7
    &[
        stack(2, 0, false, 0, 1),
        stack(1, -1, true, 0, 1),
        stack(1, -2, true, 1, 0),
        stack(2, -1, true, 0, 0),
    ],
    // Algorithm 8
    &[
        stack(2, -1, false, 0, 1),
        stack(1, 0, true, 0, 1),
        stack(1, -2, true, 1, 0),
        stack(2, -1, true, 0, 0),
    ],
    // Algorithm 9
    &[
        stack(2, -1, false, 0, 1),
        stack(1, -1, true, 0, 1),
        stack(1, -2, true, 1, 0),
        stack(2, 0, true, 0, 0),
    ],
    // Algorithm 10
    &[
        stack(1, -1, false, 0, 1),
        stack(1, -1, true, 0, 1),
        stack(1, -2, true, 1, 0),
        stack(3, 0, true, 0, 0),
    ],
    // Algorithm 11
    &[
        stack(1, 0, false, 0, 1),
        stack(1, -1, true, 0, 1),
        stack(1, -2, true, 1, 0),
        stack(3, -1, true, 0, 0),
    ],
    // Algorithm 12
    &[
        stack(1, -1, false, 0, 1),
        stack(1, -1, true, 0, 1),
        stack(1, -1, true, 0, 1),
        stack(1, -2, true, 1, 0),
        stack(2, 0, true, 0, 0),
    ],
    // Algorithm 13
    &[
        stack(1, 0, false, 0, 1),
        stack(1, -1, true, 0, 1),
        stack(1, -1, true, 0, 1),
        stack(1, -2, true, 1, 0),
        stack(2, -1, true, 0, 0),
    ],
    // Algorithm 14
    &[
        stack(1, 0, false, 0, 1),
        stack(1, -1, true, 0, 1),
        stack(2, -2, true, 1, 0),
        stack(2, -1, true, 0, 0),
    ],
    // Algorithm 15
    &[
        stack(1, -1, false, 0, 1),
        stack(1, -1, true, 0, 1),
        stack(2, -2, true, 1, 0),
        stack(2, 0, true, 0, 0),
    ],
    // Algorithm 16
    &[
        stack(2, 0, false, 0, 1),
        stack(2, -1, true, 0, 1),
        stack(1, -1, true, 0, 1),
        stack(1, -2, true, 1, 0),
    ],
    // Algorithm 17
    &[
        stack(2, -1, false, 0, 1),
        stack(2, -1, true, 0, 1),
        stack(1, 0, true, 0, 1),
        stack(1, -2, true, 1, 0),
    ],
    // Algorithm 18
    &[
        stack(3, -1, false, 0, 1),
        stack(1, 0, true, 0, 1),
        stack(1, -1, true, 0, 1),
        stack(1, -2, true, 1, 0),
    ],
    // Algorithm 19
    &[
        stack(1, 0, false, 0, 1),
        stack(1, -2, true, 1, 0),
        stack(1, -2, true, 1, 0),
        stack(3, -1, true, 0, 0),
    ],
    // Algorithm 20
    &[
        stack(1, -1, false, 0, 1),
        stack(1, -1, true, 0, 1),
        stack(1, -2, true, 1, 0),
        stack(1, 0, false, 0, 1),
        stack(1, -2, true, 1, 0),
        stack(1, -2, true, 1, 0),
    ],
    // Algorithm 21
    &[
        stack(1, -1, false, 0, 1),
        stack(1, -2, true, 1, 0),
        stack(1, -2, true, 1, 0),
        stack(1, 0, false, 0, 1),
        stack(1, -2, true, 1, 0),
        stack(1, -2, true, 1, 0),
    ],
    // Algorithm 22
    &[
        stack(1, 0, false, 0, 1),
        stack(1, -2, true, 1, 0),
        stack(1, -2, true, 1, 0),
        stack(1, -2, true, 1, 0),
        stack(2, -1, true, 0, 0),
    ],
    // Algorithm 23
    &[
        stack(1, 0, false, 0, 1),
        stack(1, -2, true, 1, 0),
        stack(1, -2, true, 1, 0),
        stack(2, -1, true, 0, 0),
        stack(1, -1, true, 0, 0),
    ],
    // Algorithm 24
    &[
        stack(1, 0, false, 0, 1),
        stack(1, -2, true, 1, 0),
        stack(1, -2, true, 1, 0),
        stack(1, -2, true, 1, 0),
        stack(1, -1, true, 0, 0),
        stack(1, -1, true, 0, 0),
    ],
    // Algorithm 25
    &[
        stack(1, 0, false, 0, 1),
        stack(1, -2, true, 1, 0),
        stack(1, -2, true, 1, 0),
        stack(1, -1, true, 0, 0),
        stack(1, -1, true, 0, 0),
        stack(1, -1, true, 0, 0),
    ],
    // Algorithm 26
    &[
        stack(1, 0, false, 0, 1),
        stack(1, -1, true, 0, 1),
        stack(1, -2, true, 1, 0),
        stack(2, -1, true, 0, 0),
        stack(1, -1, true, 0, 0),
    ],
    // Algorithm 27
    &[
        stack(1, -1, false, 0, 1),
        stack(1, -1, true, 0, 1),
        stack(1, -2, true, 1, 0),
        stack(2, 0, true, 0, 0),
        stack(1, -1, true, 0, 0),
    ],
    // Algorithm 28
    &[
        stack(1, -1, true, 0, 0),
        stack(3, 0, true, 0, 0),
        stack(2, -1, true, 0, 0),
    ],
    // Algorithm 29
    &[
        stack(2, 0, true, 0, 0),
        stack(2, -1, true, 0, 0),
        stack(1, -1, true, 0, 0),
        stack(1, -1, true, 0, 0),
    ],
    // Algorithm 30
    &[
        stack(1, -1, true, 0, 0),
        stack(3, 0, true, 0, 0),
        stack(1, -1, true, 0, 0),
        stack(1, -1, true, 0, 0),
    ],
    // Algorithm 31
    &[
        stack(2, 0, true, 0, 0),
        stack(1, -1, true, 0, 0),
        stack(1, -1, true, 0, 0),
        stack(1, -1, true, 0, 0),
        stack(1, -1, true, 0, 0),
    ],
    // Algorithm 32
    &[
        stack(1, 0, true, 0, 0),
        stack(1, -1, true, 0, 0),
        stack(1, -1, true, 0, 0),
        stack(1, -1, true, 0, 0),
        stack(1, -1, true, 0, 0),
        stack(1, -1, true, 0, 0),
    ],
];

pub const DX100_ALGORITHMS: [&[Stack]; 8] = [
    // Algorithm 1
    &[stack(4, 0, true, 0, 0)],
    // Algorithm 2
    &[
        stack(1, 0, false, 0, 1),
        stack(1, -1, true, 0, 1),
        stack(1, -2, false, 1, 1),
        stack(1, -2, true, 1, 0),
    ],
    // Algorithm 3
    &[
        stack(1, 0, false, 0, 1),
        stack(2, -1, true, 0, 1),
        stack(1, -2, true, 1, 0),
    ],
    // Algorithm 4
    &[
        stack(2, 0, false, 0, 1),
        stack(1, -1, true, 0, 1),
        stack(1, -2, true, 1, 0),
    ],
    // Algorithm 5
    &[stack(2, 0, true, 0, 0), stack(2, -1, true, 0, 0)],
    // Algorithm 6
    &[
        stack(1, 0, false, 0, 1),
        stack(1, -2, true, 1, 0),
        stack(1, -2, true, 1, 0),
        stack(1, -2, true, 1, 0),
    ],
    // Algorithm 7
    &[
        stack(2, 0, true, 0, 0),
        stack(1, -1, true, 0, 0),
        stack(1, -1, true, 0, 0),
    ],
    // Algorithm 8
    &[
        stack(1, 0, true, 0, 0),
        stack(1, -1, true, 0, 0),
        stack(1, -1, true, 0, 0),
        stack(1, -1, true, 0, 0),
    ],
];
