//! In-app notification banners

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use std::collections::VecDeque;

pub struct NoticesPlugin;

impl Plugin for NoticesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Notices>()
            .add_systems(Update, expire_notices)
            .add_systems(EguiPrimaryContextPass, notices_ui);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

impl NoticeLevel {
    fn color(self) -> egui::Color32 {
        match self {
            NoticeLevel::Info => egui::Color32::from_rgb(80, 160, 255),
            NoticeLevel::Warn => egui::Color32::from_rgb(255, 170, 40),
            NoticeLevel::Error => egui::Color32::from_rgb(240, 70, 70),
        }
    }

    /// Seconds a banner stays up
    fn lifetime(self) -> f64 {
        match self {
            NoticeLevel::Info => 4.0,
            NoticeLevel::Warn => 6.0,
            NoticeLevel::Error => 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    /// Set on first display
    expires_at: Option<f64>,
}

/// Banner queue. Oldest notices are dropped once it is full.
#[derive(Resource, Debug, Default)]
pub struct Notices {
    queue: VecDeque<Notice>,
}

impl Notices {
    const MAX_SHOWN: usize = 4;

    pub fn push(&mut self, level: NoticeLevel, text: impl Into<String>) {
        let text = text.into();
        // Repeating the same message only refreshes it
        self.queue.retain(|n| n.text != text);
        self.queue.push_back(Notice {
            level,
            text,
            expires_at: None,
        });
        while self.queue.len() > Self::MAX_SHOWN {
            self.queue.pop_front();
        }
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(NoticeLevel::Info, text);
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.push(NoticeLevel::Warn, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(NoticeLevel::Error, text);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn dismiss(&mut self, index: usize) {
        self.queue.remove(index);
    }

    /// Stamp new notices and drop expired ones
    pub fn expire(&mut self, now: f64) {
        for notice in &mut self.queue {
            notice
                .expires_at
                .get_or_insert(now + notice.level.lifetime());
        }
        self.queue
            .retain(|n| n.expires_at.is_none_or(|expires| expires > now));
    }
}

fn expire_notices(mut notices: ResMut<Notices>, time: Res<Time>) {
    if notices.is_empty() {
        return;
    }
    notices.expire(time.elapsed_secs_f64());
}

fn notices_ui(mut contexts: EguiContexts, mut notices: ResMut<Notices>) {
    if notices.is_empty() {
        return;
    }
    let Ok(ctx) = contexts.ctx_mut() else { return };

    let mut dismissed = None;
    egui::Area::new(egui::Id::new("notices"))
        .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 12.0))
        .show(ctx, |ui| {
            for (index, notice) in notices.iter().enumerate() {
                egui::Frame::popup(ui.style())
                    .stroke(egui::Stroke::new(1.0, notice.level.color()))
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.colored_label(notice.level.color(), "●");
                            ui.label(&notice.text);
                            if ui.small_button("✕").clicked() {
                                dismissed = Some(index);
                            }
                        });
                    });
            }
        });

    if let Some(index) = dismissed {
        notices.dismiss(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notices_expire_after_lifetime() {
        let mut notices = Notices::default();
        notices.info("Saved");
        notices.error("Capture failed");

        notices.expire(10.0);
        assert_eq!(notices.len(), 2);

        // Info lasts 4 seconds, errors 10
        notices.expire(14.5);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices.iter().next().unwrap().level, NoticeLevel::Error);

        notices.expire(20.5);
        assert!(notices.is_empty());
    }

    #[test]
    fn test_repeated_notice_is_not_duplicated() {
        let mut notices = Notices::default();
        notices.warn("Mesh `fan_1` is already assigned to `gpu`");
        notices.warn("Mesh `fan_1` is already assigned to `gpu`");
        assert_eq!(notices.len(), 1);
    }

    #[test]
    fn test_queue_drops_oldest() {
        let mut notices = Notices::default();
        for i in 0..6 {
            notices.info(format!("notice {}", i));
        }
        assert_eq!(notices.len(), Notices::MAX_SHOWN);
        assert_eq!(notices.iter().next().unwrap().text, "notice 2");
    }
}
