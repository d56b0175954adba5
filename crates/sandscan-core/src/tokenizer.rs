use once_cell::sync::Lazy;
use regex::Regex;

/// Ports commonly used by reverse shells and staging servers.
pub const SUSPICIOUS_PORTS: [u16; 4] = [4444, 5555, 8080, 1337];

static SUSPICIOUS_PORT_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = SUSPICIOUS_PORTS
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b({})\b", alternation)).expect("suspicious port pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    File,
    Registry,
    Network,
    Process,
    Dll,
    Thread,
}

/// Match order for category tags. A line carrying several tags is counted
/// once, under the first category listed here.
pub const CATEGORY_PRECEDENCE: [EventCategory; 6] = [
    EventCategory::File,
    EventCategory::Registry,
    EventCategory::Network,
    EventCategory::Process,
    EventCategory::Dll,
    EventCategory::Thread,
];

impl EventCategory {
    pub fn tag(&self) -> &'static str {
        match self {
            EventCategory::File => "[file]",
            EventCategory::Registry => "[registry]",
            EventCategory::Network => "[network]",
            EventCategory::Process => "[process]",
            EventCategory::Dll => "[dll]",
            EventCategory::Thread => "[thread]",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::File => "file",
            EventCategory::Registry => "registry",
            EventCategory::Network => "network",
            EventCategory::Process => "process",
            EventCategory::Dll => "dll",
            EventCategory::Thread => "thread",
        }
    }
}

/// A log line after tag classification. The body is the full line,
/// lowercased, used for keyword and path matching.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub category: Option<EventCategory>,
    pub body: String,
}

pub fn tokenize(line: &str) -> RawEvent {
    let body = line.to_lowercase();
    let category = classify(&body);
    RawEvent { category, body }
}

/// Classifies a lowercased line body. Untagged lines return None and are
/// ignored by the accumulator, never treated as errors.
pub fn classify(body: &str) -> Option<EventCategory> {
    CATEGORY_PRECEDENCE
        .iter()
        .copied()
        .find(|category| body.contains(category.tag()))
}

pub fn is_path_like(body: &str) -> bool {
    body.contains(':') && body.contains('\\')
}

pub fn has_suspicious_port(body: &str) -> bool {
    SUSPICIOUS_PORT_RE.is_match(body)
}
