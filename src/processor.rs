//! Block processor driving one voice from the audio callback.
//!
//! Control messages arrive from another thread through a [`MessageReceiver`]
//! and are drained at the start of every block, so a block is always
//! rendered against a single patch. The processor owns the LFO shared by
//! the operators, and writes the same mono signal to every output channel.
//!
//! Patch changes are logged at debug level from [`Processor::process`],
//! which runs on the audio thread. Real-time hosts need a non-blocking logger
//! or a maximum level of `Info`.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec;

#[cfg(feature = "rtrb")]
use rtrb::Consumer;

use crate::fm::algorithms::Algorithms;
use crate::fm::lfo::Lfo;
use crate::fm::patch::{Patch, PATCH_SIZE};
use crate::fm::voice::{Voice, VoiceParameters};
use crate::{Error, SampleRate};

/// Attenuation applied to the voice before it reaches the outputs.
pub const OUTPUT_GAIN: f32 = 0.125;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// Loads a packed patch and retriggers the envelopes.
    SetPatch([u8; PATCH_SIZE]),
    /// Stops the processor. The host tears it down after the current block.
    Stop,
}

impl Message {
    /// Builds a [`Message::SetPatch`] from the first [`PATCH_SIZE`] bytes of
    /// `data`.
    pub fn set_patch(data: &[u8]) -> Result<Self, Error> {
        let block = data
            .get(..PATCH_SIZE)
            .ok_or(Error::PatchTooShort { len: data.len() })?;
        let mut bytes = [0; PATCH_SIZE];
        bytes.copy_from_slice(block);

        Ok(Self::SetPatch(bytes))
    }
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<Message>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<Message> {
    fn pop(&mut self) -> Option<Message> {
        Consumer::pop(self).ok()
    }
}

impl MessageReceiver for VecDeque<Message> {
    fn pop(&mut self) -> Option<Message> {
        self.pop_front()
    }
}

/// Control values of a block, as set by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockControls {
    pub gate: bool,
    pub note: f32,
    pub velocity: f32,
    pub envelope_control: f32,
    pub brightness: f32,
}

impl Default for BlockControls {
    fn default() -> Self {
        Self {
            gate: false,
            note: 60.0,
            velocity: 0.8,
            envelope_control: 0.5,
            brightness: 0.5,
        }
    }
}

impl BlockControls {
    /// Updates gate, note and velocity from a note event. A note off only
    /// closes the gate when it matches the sounding note.
    pub fn apply(&mut self, event: NoteEvent) {
        match event {
            NoteEvent::On { note, velocity } => {
                self.gate = true;
                self.note = note as f32;
                self.velocity = velocity as f32 / 127.0;
            }
            NoteEvent::Off { note } => {
                if self.note == note as f32 {
                    self.gate = false;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEvent {
    On { note: u8, velocity: u8 },
    Off { note: u8 },
}

impl NoteEvent {
    /// Parses a MIDI note on or note off message, on any channel. A note on
    /// with a velocity of 0 is a note off. Other messages are ignored.
    pub fn from_midi(data: &[u8]) -> Option<Self> {
        let [status, note, velocity, ..] = *data else {
            return None;
        };
        let (note, velocity) = (note & 0x7F, velocity & 0x7F);

        match status & 0xF0 {
            0x80 => Some(Self::Off { note }),
            0x90 if velocity == 0 => Some(Self::Off { note }),
            0x90 => Some(Self::On { note, velocity }),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Processor<R, const NUM_OPERATORS: usize = 6, const NUM_ALGORITHMS: usize = 32> {
    voice: Voice<NUM_OPERATORS, NUM_ALGORITHMS>,
    lfo: Lfo,
    rx: R,

    running: bool,
    gate: bool,
    retrigger: bool,

    out: Box<[f32]>,
}

impl<R: MessageReceiver> Processor<R, 6, 32> {
    pub fn dx7(rx: R, sample_rate: SampleRate, block_size: usize) -> Self {
        Self::new(Algorithms::dx7(), rx, sample_rate, block_size)
    }
}

impl<R: MessageReceiver> Processor<R, 4, 8> {
    pub fn dx100(rx: R, sample_rate: SampleRate, block_size: usize) -> Self {
        Self::new(Algorithms::dx100(), rx, sample_rate, block_size)
    }
}

impl<R: MessageReceiver, const NUM_OPERATORS: usize, const NUM_ALGORITHMS: usize>
    Processor<R, NUM_OPERATORS, NUM_ALGORITHMS>
{
    pub fn new(
        algorithms: &'static Algorithms<NUM_OPERATORS, NUM_ALGORITHMS>,
        rx: R,
        sample_rate: SampleRate,
        block_size: usize,
    ) -> Self {
        let mut voice = Voice::new(algorithms, block_size);
        voice.init(sample_rate);

        Self {
            voice,
            lfo: Lfo::new(sample_rate),
            rx,
            running: true,
            gate: false,
            retrigger: false,
            out: vec![0.0; block_size].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[inline]
    pub fn voice(&self) -> &Voice<NUM_OPERATORS, NUM_ALGORITHMS> {
        &self.voice
    }

    #[inline]
    pub fn lfo(&self) -> &Lfo {
        &self.lfo
    }

    fn drain_messages(&mut self) {
        while let Some(message) = self.rx.pop() {
            match message {
                Message::SetPatch(data) => {
                    let patch = Patch::unpack(&data);
                    log::debug!(
                        "Patch loaded: {:?} (algorithm {}, feedback {})",
                        patch.name(),
                        patch.algorithm + 1,
                        patch.feedback
                    );
                    self.lfo.set(&patch.modulations);
                    self.voice.set_patch(patch);
                    self.retrigger = true;
                }
                Message::Stop => {
                    log::info!("Processor stopped");
                    self.running = false;
                }
            }
        }
    }

    /// Renders into every channel of `outputs`. Channels longer than the
    /// block size are rendered in consecutive blocks, each with its own LFO
    /// step. Returns `false` once a stop message was received.
    pub fn process(&mut self, controls: &BlockControls, outputs: &mut [&mut [f32]]) -> bool {
        self.drain_messages();

        let Some(len) = outputs.iter().map(|channel| channel.len()).max() else {
            return self.running;
        };
        let block_size = self.out.len();

        if block_size == 0 {
            for channel in outputs.iter_mut() {
                channel.fill(0.0);
            }
            return self.running;
        }

        let mut start = 0;

        while start < len {
            let size = usize::min(block_size, len - start);
            self.render_block(controls, size);

            let out = &self.out[..size];

            for channel in outputs.iter_mut() {
                let Some(chunk) = channel.get_mut(start..) else {
                    continue;
                };

                for (output, sample) in chunk.iter_mut().zip(out.iter()) {
                    *output = sample * OUTPUT_GAIN;
                }
            }

            start += size;
        }

        self.running
    }

    fn render_block(&mut self, controls: &BlockControls, size: usize) {
        let modulations = self.lfo.step(size as f32);

        // A patch change forces the gate low for one block, so that a held
        // key attacks the new sound.
        let gate = controls.gate && !self.retrigger;

        if gate && !self.gate {
            self.lfo.reset();
        }
        self.gate = gate;
        self.retrigger = false;

        let parameters = VoiceParameters {
            gate,
            note: controls.note,
            velocity: controls.velocity,
            brightness: controls.brightness,
            envelope_control: controls.envelope_control,
            pitch_mod: modulations.pitch_mod,
            amp_mod: modulations.amp_mod,
        };

        let out = &mut self.out[..size];
        out.fill(0.0);
        self.voice.render(&parameters, out);
    }
}
