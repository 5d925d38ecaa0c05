//! Projection filtrée et paginée de la fenêtre d'événements
//!
//! La projection est pure : elle ne modifie jamais l'état du moteur et peut être
//! recalculée à chaque changement de données sans perdre le filtre ni la page courante.

use crate::error::{EngineError, EngineResult};
use crate::models::{Protocol, TrafficEvent, TrafficStatus};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Prédicats de filtrage, combinés par ET lorsqu'ils sont présents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub status: Option<TrafficStatus>,
    pub protocol: Option<Protocol>,
    /// Sous-chaîne recherchée dans l'IP source ou destination (sensible à la casse)
    pub ip_substring: Option<String>,
}

impl EventFilter {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.protocol.is_none()
            && self.ip_substring.as_deref().map_or(true, str::is_empty)
    }

    pub fn matches(&self, event: &TrafficEvent) -> bool {
        if let Some(status) = self.status {
            if event.status != status {
                return false;
            }
        }

        if let Some(protocol) = self.protocol {
            if event.protocol != protocol {
                return false;
            }
        }

        if let Some(ref needle) = self.ip_substring {
            if !event.src_ip.contains(needle.as_str()) && !event.dst_ip.contains(needle.as_str()) {
                return false;
            }
        }

        true
    }
}

/// Fenêtre de pagination demandée
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub index: usize,
    pub size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            index: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Résultat d'une projection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<TrafficEvent>,
    /// Nombre total d'événements correspondants, avant découpage
    pub total_matching: usize,
}

impl Page {
    /// Nombre de pages disponibles pour une taille de page donnée
    pub fn page_count(&self, size: usize) -> usize {
        if size == 0 {
            return 0;
        }
        self.total_matching.div_ceil(size)
    }
}

/// Filtre puis découpe les événements en conservant leur ordre (du plus récent au plus ancien).
///
/// Une page au-delà des pages disponibles renvoie une liste vide avec le bon total.
pub fn apply<'a, I>(events: I, filter: &EventFilter, page: PageRequest) -> Page
where
    I: IntoIterator<Item = &'a TrafficEvent>,
{
    let start = page.index.saturating_mul(page.size);
    let mut items = Vec::with_capacity(page.size.min(64));
    let mut total_matching = 0;

    for event in events.into_iter().filter(|e| filter.matches(e)) {
        if total_matching >= start && items.len() < page.size {
            items.push(event.clone());
        }
        total_matching += 1;
    }

    Page {
        items,
        total_matching,
    }
}

/// État de présentation : filtre et page courants de l'opérateur.
///
/// Il survit aux mises à jour de données ; seul un changement de taille de page
/// ramène l'index à 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    filter: EventFilter,
    page: PageRequest,
}

impl ViewState {
    pub fn new(filter: EventFilter, page_size: usize) -> EngineResult<Self> {
        let mut state = Self {
            filter,
            page: PageRequest::default(),
        };
        state.set_page_size(page_size)?;
        Ok(state)
    }

    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    pub fn page(&self) -> PageRequest {
        self.page
    }

    pub fn set_status(&mut self, status: Option<TrafficStatus>) {
        self.filter.status = status;
    }

    pub fn set_protocol(&mut self, protocol: Option<Protocol>) {
        self.filter.protocol = protocol;
    }

    pub fn set_ip_substring(&mut self, needle: Option<String>) {
        self.filter.ip_substring = needle.filter(|s| !s.is_empty());
    }

    pub fn clear_filters(&mut self) {
        self.filter = EventFilter::default();
    }

    pub fn set_page(&mut self, index: usize) {
        self.page.index = index;
    }

    /// Change la taille de page et revient à la première page
    pub fn set_page_size(&mut self, size: usize) -> EngineResult<()> {
        if size == 0 {
            return Err(EngineError::InvalidPageSize(size));
        }
        if size != self.page.size {
            self.page = PageRequest { index: 0, size };
        }
        Ok(())
    }

    pub fn next_page(&mut self) {
        self.page.index = self.page.index.saturating_add(1);
    }

    pub fn previous_page(&mut self) {
        self.page.index = self.page.index.saturating_sub(1);
    }

    pub fn project<'a, I>(&self, events: I) -> Page
    where
        I: IntoIterator<Item = &'a TrafficEvent>,
    {
        apply(events, &self.filter, self.page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(src: &str, dst: &str, protocol: Protocol, status: TrafficStatus) -> TrafficEvent {
        TrafficEvent {
            id: None,
            timestamp: NaiveDate::from_ymd_opt(2025, 3, 14)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            src_ip: src.to_string(),
            dst_ip: dst.to_string(),
            src_port: None,
            dst_port: Some(80),
            protocol,
            status,
            prediction: String::new(),
            confidence: 0.5,
            length: 0,
            attack_type: None,
            involves_local: false,
        }
    }

    fn sample() -> Vec<TrafficEvent> {
        vec![
            event("45.155.205.233", "192.168.1.10", Protocol::Tcp, TrafficStatus::Attack),
            event("192.168.1.10", "8.8.8.8", Protocol::Tcp, TrafficStatus::Normal),
            event("1.1.1.1", "192.168.1.10", Protocol::Udp, TrafficStatus::Suspicious),
            event("5.188.86.172", "192.168.1.10", Protocol::Udp, TrafficStatus::Attack),
            event("185.220.100.242", "192.168.1.10", Protocol::Tcp, TrafficStatus::Attack),
        ]
    }

    #[test]
    fn test_and_semantics_is_intersection() {
        let events = sample();
        let filter = EventFilter {
            status: Some(TrafficStatus::Attack),
            protocol: Some(Protocol::Tcp),
            ip_substring: None,
        };
        let page = apply(&events, &filter, PageRequest { index: 0, size: 50 });

        let expected: Vec<_> = events
            .iter()
            .filter(|e| e.status == TrafficStatus::Attack)
            .filter(|e| e.protocol == Protocol::Tcp)
            .cloned()
            .collect();
        assert_eq!(page.items, expected);
        assert_eq!(page.total_matching, 2);
    }

    #[test]
    fn test_ip_substring_is_anded_with_protocol() {
        let events = sample();
        let filter = EventFilter {
            status: None,
            protocol: Some(Protocol::Udp),
            ip_substring: Some("192.168".to_string()),
        };
        let page = apply(&events, &filter, PageRequest::default());
        assert_eq!(page.total_matching, 2);
        assert!(page.items.iter().all(|e| e.protocol == Protocol::Udp));
    }

    #[test]
    fn test_ip_substring_matches_either_side_and_empty_matches_all() {
        let events = sample();
        let by_dst = EventFilter {
            ip_substring: Some("8.8.8".to_string()),
            ..Default::default()
        };
        assert_eq!(apply(&events, &by_dst, PageRequest::default()).total_matching, 1);

        let empty = EventFilter {
            ip_substring: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(apply(&events, &empty, PageRequest::default()).total_matching, 5);
    }

    #[test]
    fn test_pagination_slices_and_clips() {
        let events = sample();
        let filter = EventFilter::default();
        let second = apply(&events, &filter, PageRequest { index: 1, size: 2 });
        assert_eq!(second.items, events[2..4].to_vec());
        let last = apply(&events, &filter, PageRequest { index: 2, size: 2 });
        assert_eq!(last.items, events[4..].to_vec());
        assert_eq!(last.page_count(2), 3);
    }

    #[test]
    fn test_page_beyond_bounds_is_empty_with_total() {
        let events = sample();
        let page = apply(&events, &EventFilter::default(), PageRequest { index: 7, size: 2 });
        assert!(page.items.is_empty());
        assert_eq!(page.total_matching, 5);
    }

    #[test]
    fn test_changing_page_size_resets_index() {
        let mut view = ViewState::new(EventFilter::default(), 2).unwrap();
        view.set_page(2);
        view.set_status(Some(TrafficStatus::Attack));
        assert_eq!(view.page().index, 2);

        view.set_page_size(5).unwrap();
        assert_eq!(view.page(), PageRequest { index: 0, size: 5 });
        assert_eq!(view.filter().status, Some(TrafficStatus::Attack));
        assert!(matches!(view.set_page_size(0), Err(EngineError::InvalidPageSize(0))));
    }

    #[test]
    fn test_clear_filters_keeps_page() {
        let mut view = ViewState::default();
        view.set_protocol(Some(Protocol::Icmp));
        view.set_ip_substring(Some("10.".to_string()));
        view.next_page();
        view.clear_filters();
        assert!(view.filter().is_empty());
        assert_eq!(view.page().index, 1);
    }
}
