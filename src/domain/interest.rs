use std::collections::BTreeSet;

/// Fixed vocabulary of newsletter topics a subscriber can follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Interest {
    WebDevelopment,
    GraphicDesign,
    VideoEditing,
    MusicProduction,
    OnlineJobs,
    ComputerPackages,
    RoboticsMl,
    CyberSecurity,
    /// Wildcard: the subscriber receives every topic.
    All,
}

impl Interest {
    pub const VOCABULARY: [Interest; 9] = [
        Interest::WebDevelopment,
        Interest::GraphicDesign,
        Interest::VideoEditing,
        Interest::MusicProduction,
        Interest::OnlineJobs,
        Interest::ComputerPackages,
        Interest::RoboticsMl,
        Interest::CyberSecurity,
        Interest::All,
    ];

    pub fn parse(tag: &str) -> Result<Interest, String> {
        Interest::VOCABULARY
            .into_iter()
            .find(|interest| interest.as_ref() == tag.trim())
            .ok_or_else(|| format!("{} is not a known interest", tag))
    }
}

impl AsRef<str> for Interest {
    fn as_ref(&self) -> &str {
        match self {
            Interest::WebDevelopment => "web-development",
            Interest::GraphicDesign => "graphic-design",
            Interest::VideoEditing => "video-editing",
            Interest::MusicProduction => "music-production",
            Interest::OnlineJobs => "online-jobs",
            Interest::ComputerPackages => "computer-packages",
            Interest::RoboticsMl => "robotics-ml",
            Interest::CyberSecurity => "cyber-security",
            Interest::All => "all",
        }
    }
}

impl serde::Serialize for Interest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_ref())
    }
}

/// Non-empty set of interests.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Interests(BTreeSet<Interest>);

impl Interests {
    /// Interests given to a subscriber who did not pick any.
    pub fn everything() -> Interests {
        Interests(BTreeSet::from([Interest::All]))
    }

    /// Returns `None` when no tag was supplied, so callers can fall back to a default.
    pub fn parse<S: AsRef<str>>(tags: &[S]) -> Result<Option<Interests>, String> {
        let interests = tags
            .iter()
            .map(|tag| Interest::parse(tag.as_ref()))
            .collect::<Result<BTreeSet<_>, _>>()?;

        if interests.is_empty() {
            return Ok(None);
        }

        Ok(Some(Interests(interests)))
    }

    /// True when the subscriber follows `interest` directly or through the `all` wildcard.
    pub fn covers(&self, interest: Interest) -> bool {
        self.0.contains(&interest) || self.0.contains(&Interest::All)
    }

    pub fn contains(&self, interest: Interest) -> bool {
        self.0.contains(&interest)
    }

    pub fn tags(&self) -> Vec<String> {
        self.0.iter().map(|interest| interest.as_ref().to_string()).collect()
    }
}
