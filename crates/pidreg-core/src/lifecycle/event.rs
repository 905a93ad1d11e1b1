use std::{fmt, str::FromStr};

///
/// LifecycleEvent
///
/// Every event the state machine understands, including the automated
/// `Flag` and `LinkCheck` events.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LifecycleEvent {
    Register,
    Publish,
    Hide,
    Show,
    Flag,
    LinkCheck,
}

impl LifecycleEvent {
    pub const ALL: [Self; 6] = [
        Self::Register,
        Self::Publish,
        Self::Hide,
        Self::Show,
        Self::Flag,
        Self::LinkCheck,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Publish => "publish",
            Self::Hide => "hide",
            Self::Show => "show",
            Self::Flag => "flag",
            Self::LinkCheck => "link_check",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// UserEvent
///
/// Events a caller may request through the `event` field on update.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum UserEvent {
    Register,
    Publish,
    Hide,
    Show,
}

impl From<UserEvent> for LifecycleEvent {
    fn from(event: UserEvent) -> Self {
        match event {
            UserEvent::Register => Self::Register,
            UserEvent::Publish => Self::Publish,
            UserEvent::Hide => Self::Hide,
            UserEvent::Show => Self::Show,
        }
    }
}

impl FromStr for UserEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "register" => Ok(Self::Register),
            "publish" => Ok(Self::Publish),
            "hide" => Ok(Self::Hide),
            "show" => Ok(Self::Show),
            other => Err(format!("unsupported event '{other}'")),
        }
    }
}
