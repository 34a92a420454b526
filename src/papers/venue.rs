use anyhow::anyhow;
use std::fmt;
use std::str::FromStr;

/// Conferences the listing source knows how to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Venue {
    Cvpr,
    Iccv,
    Iclr,
    Icml,
    Eccv,
    Icra,
    NeurIPS,
}

const ALIASES: &[(&str, Venue)] = &[
    ("cvpr", Venue::Cvpr),
    ("iccv", Venue::Iccv),
    ("iclr", Venue::Iclr),
    ("icml", Venue::Icml),
    ("eccv", Venue::Eccv),
    ("icra", Venue::Icra),
    ("nips", Venue::NeurIPS),
    ("neurips", Venue::NeurIPS),
];

impl Venue {
    /// Canonical spelling, used in snapshot keys and output file names.
    pub fn name(self) -> &'static str {
        match self {
            Venue::Cvpr => "CVPR",
            Venue::Iccv => "ICCV",
            Venue::Iclr => "ICLR",
            Venue::Icml => "ICML",
            Venue::Eccv => "ECCV",
            Venue::Icra => "ICRA",
            Venue::NeurIPS => "NeurIPS",
        }
    }

    pub fn aliases() -> impl Iterator<Item = &'static str> {
        ALIASES.iter().map(|(alias, _)| *alias)
    }
}

impl FromStr for Venue {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == needle)
            .map(|(_, venue)| *venue)
            .ok_or_else(|| {
                anyhow!(
                    "Conference must be one of {}",
                    Venue::aliases().collect::<Vec<_>>().join(", ")
                )
            })
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
