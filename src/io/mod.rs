//! External collaborator traits and their desktop implementations: the
//! sound source, the sound-file writer, the filename template expander,
//! and the gating switch.

mod sound_file_writer;
mod sound_source;
mod switch;
mod template;

pub use sound_file_writer::{HoundSoundFileWriter, SoundFileWriter};
pub use sound_source::{CpalSoundSource, SoundSource};
pub use switch::{ManualSwitch, NullSwitch, Switch};
pub use template::{SimpleTemplateExpander, TemplateExpander, TemplateVars};
