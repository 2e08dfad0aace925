use std::fmt;

use serde::{Deserialize, Serialize};

pub const CC_MIN: u8 = 0;
pub const CC_MAX: u8 = 127;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ChannelNumber);
id_newtype!(ControllerNumber);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub channel: ChannelNumber,
    pub controller: ControllerNumber,
}

impl Identity {
    pub fn new(channel: i64, controller: i64) -> Self {
        Self {
            channel: ChannelNumber(channel),
            controller: ControllerNumber(controller),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel, self.controller)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlKind {
    HSlider,
    VSlider,
    StepButton,
    Display,
}

impl ControlKind {
    pub fn tag_name(self) -> &'static str {
        match self {
            ControlKind::HSlider => "cc-hslider",
            ControlKind::VSlider => "cc-vslider",
            ControlKind::StepButton => "cc-step-button",
            ControlKind::Display => "cc-display",
        }
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag_name())
    }
}
