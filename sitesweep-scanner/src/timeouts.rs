use std::time::Duration;

/// Per-operation time limits. A slow or absent element must never stall a
/// crawl, so every interactive wait is short and treated as "not found".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Visibility check on a candidate element.
    pub visibility: Duration,
    /// Hover/click on a located element.
    pub action: Duration,
    /// Click on a mobile menu toggle.
    pub menu_click: Duration,
    /// DOM settling after a menu interaction.
    pub settle: Duration,
    /// Network idle wait after loading the root page.
    pub network_idle: Duration,
    /// Page navigation.
    pub navigation: Duration,
    /// Plain HTTP request (footer link checks).
    pub request: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            visibility: Duration::from_secs(1),
            action: Duration::from_secs(2),
            menu_click: Duration::from_secs(3),
            settle: Duration::from_secs(3),
            network_idle: Duration::from_secs(10),
            navigation: Duration::from_secs(20),
            request: Duration::from_secs(15),
        }
    }
}

impl Timeouts {
    /// Very short limits for tests and fixtures.
    pub fn fast() -> Self {
        Self {
            visibility: Duration::from_millis(50),
            action: Duration::from_millis(50),
            menu_click: Duration::from_millis(50),
            settle: Duration::from_millis(50),
            network_idle: Duration::from_millis(100),
            navigation: Duration::from_secs(5),
            request: Duration::from_secs(5),
        }
    }
}
