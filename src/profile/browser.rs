//! Randomized browser identity for one download session.
//!
//! A profile is generated once when a session starts and reused for every
//! request in it. Mixing identities mid-session is exactly the kind of
//! fingerprint mismatch the upstream anti-bot layer looks for, so the
//! struct is immutable and never regenerated.

use rand::Rng;
use rand::seq::SliceRandom;

/// Chrome major versions seen in the wild recently enough to be plausible.
const CHROME_MAJOR_VERSIONS: &[u32] = &[
    105, 106, 107, 108, 109, 110, 111, 112, 113, 114, 115, 116, 117, 118,
];

/// Operating system fragments for the User-Agent comment.
const OS_LIST: &[&str] = &[
    "Windows NT 10.0; Win64; x64",
    "Windows NT 10.0; WOW64",
    "Macintosh; Intel Mac OS X 10_15_7",
    "Macintosh; Intel Mac OS X 11_2_3",
    "X11; Linux x86_64",
];

/// Common desktop viewport widths and heights.
const VIEWPORT_WIDTHS: &[u32] = &[1366, 1440, 1536, 1920, 2560];
const VIEWPORT_HEIGHTS: &[u32] = &[768, 900, 864, 1080, 1440];

/// Immutable per-session browser identity.
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    /// Full User-Agent string sent on every request.
    pub user_agent: String,
    /// Navigator platform label consistent with the User-Agent.
    pub platform: &'static str,
    /// Viewport dimensions (width, height).
    pub viewport: (u32, u32),
}

impl BrowserProfile {
    /// Generates a random but internally consistent profile.
    ///
    /// The platform label is derived from the OS chosen for the
    /// User-Agent so the two never disagree.
    pub fn generate(rng: &mut impl Rng) -> Self {
        let os = OS_LIST.choose(rng).copied().unwrap_or(OS_LIST[0]);
        let major = CHROME_MAJOR_VERSIONS
            .choose(rng)
            .copied()
            .unwrap_or(CHROME_MAJOR_VERSIONS[0]);
        let minor = rng.gen_range(0..=3);
        let patch = rng.gen_range(0..=5);
        let build = rng.gen_range(10..=200);

        let user_agent = format!(
            "Mozilla/5.0 ({os}) AppleWebKit/537.36 (KHTML, like Gecko) \
             Chrome/{major}.{minor}.{patch}.{build} Safari/537.36"
        );

        let platform = if os.contains("Windows") {
            "Windows"
        } else if os.contains("Mac") {
            "MacIntel"
        } else {
            "Linux x86_64"
        };

        let width = VIEWPORT_WIDTHS.choose(rng).copied().unwrap_or(1920);
        let height = VIEWPORT_HEIGHTS.choose(rng).copied().unwrap_or(1080);

        Self {
            user_agent,
            platform,
            viewport: (width, height),
        }
    }
}
