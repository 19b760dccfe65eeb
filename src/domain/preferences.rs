/// The set of newsletter topics a subscriber can opt in or out of. New
/// subscribers receive everything unless they say otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriberPreferences {
    pub events: bool,
    pub stories: bool,
    pub volunteer_opportunities: bool,
    pub donation_updates: bool,
}

impl Default for SubscriberPreferences {
    fn default() -> Self {
        Self {
            events: true,
            stories: true,
            volunteer_opportunities: true,
            donation_updates: true,
        }
    }
}

impl SubscriberPreferences {
    pub fn allows(&self, preference: Preference) -> bool {
        match preference {
            Preference::Events => self.events,
            Preference::Stories => self.stories,
            Preference::VolunteerOpportunities => self.volunteer_opportunities,
            Preference::DonationUpdates => self.donation_updates,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    Events,
    Stories,
    VolunteerOpportunities,
    DonationUpdates,
}

impl Preference {
    pub fn parse(preference: &str) -> Result<Preference, String> {
        match preference {
            "events" => Ok(Preference::Events),
            "stories" => Ok(Preference::Stories),
            "volunteerOpportunities" => Ok(Preference::VolunteerOpportunities),
            "donationUpdates" => Ok(Preference::DonationUpdates),
            _ => Err(format!("{} is not a valid preference", preference)),
        }
    }
}

impl AsRef<str> for Preference {
    fn as_ref(&self) -> &str {
        match self {
            Preference::Events => "events",
            Preference::Stories => "stories",
            Preference::VolunteerOpportunities => "volunteerOpportunities",
            Preference::DonationUpdates => "donationUpdates",
        }
    }
}

/// Which subscribers a campaign goes out to: everyone, or only those with a
/// given preference switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Audience {
    All,
    Preference(Preference),
}

impl Audience {
    pub fn parse(audience: &str) -> Result<Audience, String> {
        match audience {
            "all" => Ok(Audience::All),
            other => Preference::parse(other).map(Audience::Preference),
        }
    }
}

impl AsRef<str> for Audience {
    fn as_ref(&self) -> &str {
        match self {
            Audience::All => "all",
            Audience::Preference(preference) => preference.as_ref(),
        }
    }
}

impl TryFrom<String> for Audience {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Audience::parse(&value)
    }
}

impl From<Audience> for String {
    fn from(audience: Audience) -> String {
        audience.as_ref().to_string()
    }
}
