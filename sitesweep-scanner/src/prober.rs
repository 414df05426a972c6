//! Interaction strategies that reveal navigation hidden behind menus.
//!
//! Each strategy is a locator plus the interaction to perform on it. A list
//! of strategies is tried in order and every entry is isolated: a miss,
//! a timeout or a failed action only moves on to the next entry.

use crate::browser::{AriaRole, BrowserPage, LoadState, Locator};
use crate::error::Result;
use crate::section::Section;
use crate::timeouts::Timeouts;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// Scroll into view and hover; click too when the element is button-like.
    Reveal,
    Hover,
    Click,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeStrategy {
    pub locator: Locator,
    pub interaction: Interaction,
}

impl ProbeStrategy {
    pub fn new(locator: Locator, interaction: Interaction) -> Self {
        Self {
            locator,
            interaction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A strategy matched a visible element and its interaction completed.
    Interacted { strategy: usize, clicked: bool },
    NotFound,
}

/// Result of trying to open a mobile hamburger menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuProbe {
    pub hamburger_detected: bool,
    pub menu_opened: bool,
    pub notes: String,
}

/// Triggers for a section's dropdown, most specific first.
pub fn section_menu_strategies(label: &str) -> Vec<ProbeStrategy> {
    let mut strategies: Vec<ProbeStrategy> = [
        "header a",
        "header button",
        "nav a",
        "nav button",
        "[role=\"button\"]",
        "a",
    ]
    .into_iter()
    .map(|selector| ProbeStrategy::new(Locator::css_with_text(selector, label), Interaction::Reveal))
    .collect();

    strategies.push(ProbeStrategy::new(
        Locator::role(AriaRole::Link, label),
        Interaction::Hover,
    ));
    strategies.push(ProbeStrategy::new(
        Locator::role(AriaRole::Button, label),
        Interaction::Click,
    ));
    strategies
}

/// Cookie/consent banner buttons. All of them are tried, not just the first hit.
pub fn cookie_consent_strategies() -> Vec<ProbeStrategy> {
    let mut strategies: Vec<ProbeStrategy> = ["Accept", "I agree", "Agree", "Allow all", "Got it"]
        .into_iter()
        .map(|text| ProbeStrategy::new(Locator::css_with_text("button", text), Interaction::Click))
        .collect();
    strategies.push(ProbeStrategy::new(
        Locator::css("[aria-label*=\"accept\" i]"),
        Interaction::Click,
    ));
    strategies
}

pub fn mobile_menu_strategies() -> Vec<ProbeStrategy> {
    vec![
        ProbeStrategy::new(Locator::css("button[aria-label*=\"menu\" i]"), Interaction::Click),
        ProbeStrategy::new(Locator::css("button[aria-controls*=\"menu\" i]"), Interaction::Click),
        ProbeStrategy::new(Locator::css("button[class*=\"menu\" i]"), Interaction::Click),
        ProbeStrategy::new(Locator::css("[data-testid*=\"menu\" i]"), Interaction::Click),
        ProbeStrategy::new(Locator::css_with_text("button", "Menu"), Interaction::Click),
        ProbeStrategy::new(
            Locator::css("[role=\"button\"][aria-label*=\"menu\" i]"),
            Interaction::Click,
        ),
    ]
}

/// Anchors that count as menu items once a hamburger has been toggled.
pub fn mobile_menu_items() -> Locator {
    Locator::css("nav a, [role=\"menu\"] a, header a")
}

pub struct MenuProber {
    timeouts: Timeouts,
}

impl MenuProber {
    pub fn new(timeouts: Timeouts) -> Self {
        Self { timeouts }
    }

    /// Try to reveal the dropdown for `section`. Never fails; gives up silently.
    pub async fn open_section_menu(
        &self,
        page: &mut dyn BrowserPage,
        section: Section,
    ) -> ProbeOutcome {
        let outcome = self
            .run_first(page, &section_menu_strategies(section.label()))
            .await;

        if matches!(outcome, ProbeOutcome::Interacted { .. }) {
            // A hovered link may also have navigated; either way give the DOM a moment.
            if let Err(e) = page
                .wait_for_load_state(LoadState::DomContentLoaded, self.timeouts.settle)
                .await
            {
                debug!("Settle wait after opening {} ended early: {}", section, e);
            }
        } else {
            debug!("No menu trigger found for section {}", section);
        }
        outcome
    }

    /// Click every visible consent button. Returns how many were clicked.
    pub async fn dismiss_cookie_banners(&self, page: &mut dyn BrowserPage) -> usize {
        let mut clicked = 0;
        for strategy in cookie_consent_strategies() {
            match self.attempt(page, &strategy).await {
                Ok(Some(_)) => clicked += 1,
                Ok(None) => {}
                Err(e) => debug!("Consent candidate {} failed: {}", strategy.locator, e),
            }
        }
        clicked
    }

    /// Find a hamburger toggle, click it, and check that menu items appear.
    pub async fn open_mobile_menu(&self, page: &mut dyn BrowserPage) -> MenuProbe {
        let items = mobile_menu_items();

        for strategy in mobile_menu_strategies() {
            match page.is_visible(&strategy.locator, self.timeouts.visibility).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    debug!("Menu toggle {} not usable: {}", strategy.locator, e);
                    continue;
                }
            }

            if let Err(e) = page.click(&strategy.locator, self.timeouts.menu_click).await {
                debug!("Menu toggle {} could not be clicked: {}", strategy.locator, e);
                continue;
            }

            let count = match page.count_visible(&items).await {
                Ok(count) => count,
                Err(e) => {
                    debug!("Counting menu items failed: {}", e);
                    continue;
                }
            };

            return if count > 0 {
                MenuProbe {
                    hamburger_detected: true,
                    menu_opened: true,
                    notes: format!("Menu opened; visible items: {}", count),
                }
            } else {
                MenuProbe {
                    hamburger_detected: true,
                    menu_opened: false,
                    notes: "Hamburger detected but no menu items became visible".to_string(),
                }
            };
        }

        MenuProbe {
            hamburger_detected: false,
            menu_opened: false,
            notes: "No hamburger menu detected on this page".to_string(),
        }
    }

    /// Act on the first strategy whose element is visible and whose interaction succeeds.
    pub async fn run_first(
        &self,
        page: &mut dyn BrowserPage,
        strategies: &[ProbeStrategy],
    ) -> ProbeOutcome {
        for (index, strategy) in strategies.iter().enumerate() {
            match self.attempt(page, strategy).await {
                Ok(Some(clicked)) => {
                    debug!("Strategy {} ({}) interacted", index, strategy.locator);
                    return ProbeOutcome::Interacted {
                        strategy: index,
                        clicked,
                    };
                }
                Ok(None) => {}
                Err(e) => debug!("Strategy {} ({}) failed: {}", index, strategy.locator, e),
            }
        }
        ProbeOutcome::NotFound
    }

    /// `Ok(None)` when the element is not visible, `Ok(Some(clicked))` after
    /// the interaction ran.
    async fn attempt(
        &self,
        page: &mut dyn BrowserPage,
        strategy: &ProbeStrategy,
    ) -> Result<Option<bool>> {
        let locator = &strategy.locator;
        if !page.is_visible(locator, self.timeouts.visibility).await? {
            return Ok(None);
        }

        let clicked = match strategy.interaction {
            Interaction::Reveal => {
                page.scroll_into_view(locator, self.timeouts.action).await?;
                page.hover(locator, self.timeouts.action).await?;
                if self.is_button_like(page, locator).await? {
                    page.click(locator, self.timeouts.action).await?;
                    true
                } else {
                    false
                }
            }
            Interaction::Hover => {
                page.hover(locator, self.timeouts.action).await?;
                false
            }
            Interaction::Click => {
                page.click(locator, self.timeouts.action).await?;
                true
            }
        };

        Ok(Some(clicked))
    }

    async fn is_button_like(&self, page: &dyn BrowserPage, locator: &Locator) -> Result<bool> {
        if page.tag_name(locator).await? == "button" {
            return Ok(true);
        }
        let role = page.attribute(locator, "role").await?;
        Ok(role.is_some_and(|r| r.eq_ignore_ascii_case("button")))
    }
}
