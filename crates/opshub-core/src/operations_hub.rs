//! Operations Hub catalog.
//!
//! The hub lists EHS/EAM features that are not built yet; each entry resolves
//! to a placeholder page.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HubFeature {
    pub title: &'static str,
    pub description: &'static str,
    pub path: &'static str,
}

impl HubFeature {
    /// Last path segment, e.g. "work-orders".
    pub fn slug(&self) -> &'static str {
        self.path.rsplit('/').next().unwrap_or(self.path)
    }

    pub fn placeholder_text(&self) -> String {
        format!(
            "{}\n\n{}\n\nThis feature is coming soon.",
            self.title, self.description
        )
    }
}

pub const HUB_FEATURES: [HubFeature; 9] = [
    HubFeature {
        title: "Incidents & Near Misses",
        description: "Track and manage incidents and near misses",
        path: "/operations-hub/incidents",
    },
    HubFeature {
        title: "Work Orders",
        description: "Create, assign, and monitor work orders",
        path: "/operations-hub/work-orders",
    },
    HubFeature {
        title: "Assets (Critical)",
        description: "Maintain critical asset information",
        path: "/operations-hub/assets",
    },
    HubFeature {
        title: "Inspections",
        description: "Schedule and record inspections",
        path: "/operations-hub/inspections",
    },
    HubFeature {
        title: "Permits to Work (PTW)",
        description: "Oversee change management processes",
        path: "/operations-hub/ptw",
    },
    HubFeature {
        title: "Management of Change (MoC)",
        description: "Oversee change management processes",
        path: "/operations-hub/moc",
    },
    HubFeature {
        title: "Investigations & RCA",
        description: "Conduct investigations and root cause analysis",
        path: "/operations-hub/investigations",
    },
    HubFeature {
        title: "Compliance & Audits",
        description: "Conduct investigations and root cause analysis",
        path: "/operations-hub/audits",
    },
    HubFeature {
        title: "Analytics",
        description: "View operational analytics and trends",
        path: "/operations-hub/analytics",
    },
];

/// Look up a feature by slug ("ptw") or full path ("/operations-hub/ptw").
pub fn find_feature(key: &str) -> Option<&'static HubFeature> {
    let key = key.trim().trim_end_matches('/');
    HUB_FEATURES
        .iter()
        .find(|f| f.path == key || f.slug().eq_ignore_ascii_case(key))
}
