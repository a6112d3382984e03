//! Warcraft III startup options and their command line tokens

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A single startup switch understood by war3.exe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartOption {
    /// Windowed mode
    Window,
    /// OpenGL renderer
    OpenGl,
    /// Software transform and lighting
    Swtnl,
    /// Classic (Reign of Chaos) mode
    Classic,
}

impl StartOption {
    /// All options in the order their tokens are emitted
    pub const ALL: [StartOption; 4] = [
        StartOption::Window,
        StartOption::OpenGl,
        StartOption::Swtnl,
        StartOption::Classic,
    ];

    fn bit(self) -> u8 {
        match self {
            StartOption::Window => 1,
            StartOption::OpenGl => 2,
            StartOption::Swtnl => 4,
            StartOption::Classic => 8,
        }
    }

    /// Space-padded command line token
    pub fn token(self) -> &'static str {
        match self {
            StartOption::Window => " -window ",
            StartOption::OpenGl => " -opengl ",
            StartOption::Swtnl => " -swtnl ",
            StartOption::Classic => " -classic ",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StartOption::Window => "window",
            StartOption::OpenGl => "opengl",
            StartOption::Swtnl => "swtnl",
            StartOption::Classic => "classic",
        }
    }
}

impl fmt::Display for StartOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StartOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().trim_start_matches('-').to_ascii_lowercase();
        StartOption::ALL
            .into_iter()
            .find(|opt| opt.name() == lower)
            .ok_or_else(|| format!("unknown start option: {}", s))
    }
}

/// A set of startup options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<StartOption>", into = "Vec<StartOption>")]
pub struct StartOptions(u8);

impl StartOptions {
    pub const NONE: StartOptions = StartOptions(0);

    pub fn contains(self, opt: StartOption) -> bool {
        self.0 & opt.bit() != 0
    }

    pub fn insert(&mut self, opt: StartOption) {
        self.0 |= opt.bit();
    }

    pub fn with(mut self, opt: StartOption) -> Self {
        self.insert(opt);
        self
    }

    pub fn union(self, other: StartOptions) -> Self {
        StartOptions(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Present options in declaration order
    pub fn iter(self) -> impl Iterator<Item = StartOption> {
        StartOption::ALL.into_iter().filter(move |opt| self.contains(*opt))
    }
}

impl FromIterator<StartOption> for StartOptions {
    fn from_iter<I: IntoIterator<Item = StartOption>>(iter: I) -> Self {
        let mut set = StartOptions::NONE;
        for opt in iter {
            set.insert(opt);
        }
        set
    }
}

impl From<Vec<StartOption>> for StartOptions {
    fn from(opts: Vec<StartOption>) -> Self {
        opts.into_iter().collect()
    }
}

impl From<StartOptions> for Vec<StartOption> {
    fn from(set: StartOptions) -> Self {
        set.iter().collect()
    }
}

/// Build the argument string appended after the quoted executable path
pub fn encode(options: StartOptions) -> String {
    options.iter().map(StartOption::token).collect()
}
