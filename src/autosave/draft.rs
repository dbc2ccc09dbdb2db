use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{LinkPayload, ProfilePayload, ProfileWithLinks, Theme};

/// Folding the server's canonical answer back into local state.
///
/// `merge_local` is called on the canonical value with the draft that was
/// sent, and carries over fields the server does not store. `adopt_ids` is
/// called on a draft that moved on during the save so it picks up ids the
/// server assigned to what was sent without losing the newer edits.
pub trait Reconcile {
    fn merge_local(self, sent: &Self) -> Self;

    fn adopt_ids(&mut self, sent: &Self, canonical: &Self);
}

/// Editable copy of a profile and its links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileDraft {
    pub id: Option<Uuid>,
    pub name: String,
    pub handle: String,
    pub headline: Option<String>,
    pub theme: String,
    pub is_active: bool,
    pub links: Vec<LinkDraft>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDraft {
    pub id: Option<Uuid>,
    pub title: String,
    pub url: String,
    pub is_active: bool,
    /// UI only, never sent to the server.
    pub icon: Option<String>,
    /// UI only, never sent to the server.
    pub color: Option<String>,
}

impl LinkDraft {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            url: url.into(),
            is_active: true,
            icon: None,
            color: None,
        }
    }
}

impl ProfileDraft {
    pub fn new(name: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: handle.into(),
            theme: Theme::default().to_string(),
            ..Self::default()
        }
    }

    /// What gets posted. Only an explicit activation is forwarded; the
    /// server decides the rest.
    pub fn to_payload(&self) -> ProfilePayload {
        ProfilePayload {
            id: self.id,
            name: self.name.clone(),
            handle: self.handle.clone(),
            headline: self.headline.clone(),
            theme: Some(self.theme.clone()),
            active: self.is_active.then_some(true),
            links: self
                .links
                .iter()
                .map(|l| LinkPayload {
                    id: l.id,
                    title: l.title.clone(),
                    url: l.url.clone(),
                    is_active: l.is_active,
                })
                .collect(),
        }
    }
}

impl From<ProfileWithLinks> for ProfileDraft {
    fn from(saved: ProfileWithLinks) -> Self {
        let ProfileWithLinks { profile, links } = saved;
        Self {
            id: Some(profile.id),
            name: profile.name,
            handle: profile.handle,
            headline: profile.headline,
            theme: profile.theme.to_string(),
            is_active: profile.is_active,
            links: links
                .into_iter()
                .map(|l| LinkDraft {
                    id: Some(l.id),
                    title: l.title,
                    url: l.url,
                    is_active: l.is_active,
                    icon: None,
                    color: None,
                })
                .collect(),
        }
    }
}

impl From<&ProfileDraft> for ProfilePayload {
    fn from(draft: &ProfileDraft) -> Self {
        draft.to_payload()
    }
}

impl Reconcile for ProfileDraft {
    fn merge_local(mut self, sent: &Self) -> Self {
        for (index, link) in self.links.iter_mut().enumerate() {
            let local = sent
                .links
                .iter()
                .find(|l| l.id.is_some() && l.id == link.id)
                .or_else(|| sent.links.get(index).filter(|l| l.id.is_none()));
            if let Some(local) = local {
                link.icon = local.icon.clone();
                link.color = local.color.clone();
            }
        }
        self
    }

    fn adopt_ids(&mut self, sent: &Self, canonical: &Self) {
        if self.id.is_none() {
            self.id = canonical.id;
        }

        // saved links come back in the order they were sent
        if sent.links.len() != canonical.links.len() {
            return;
        }
        let assigned = sent
            .links
            .iter()
            .zip(&canonical.links)
            .filter(|(sent, _)| sent.id.is_none())
            .map(|(_, saved)| saved.id);
        let pending = self.links.iter_mut().filter(|l| l.id.is_none());
        for (link, id) in pending.zip(assigned) {
            link.id = id;
        }
    }
}
