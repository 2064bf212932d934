//! Presence and typing projection.
//!
//! Folds server-pushed events into the view the UI renders: the capped
//! message list, the online users, and who is typing. The server is
//! authoritative; this is a read-model and never originates state of its own
//! besides the unread counter.

use std::collections::{HashSet, VecDeque};

use chatline_proto::{Message, ServerEvent, User};

/// Messages kept locally.
pub const DEFAULT_MESSAGE_CAP: usize = 100;

/// Local view of the room.
#[derive(Debug, Clone)]
pub struct Presence {
    cap: usize,
    messages: VecDeque<Message>,
    users: Vec<User>,
    /// User IDs currently flagged as typing
    typing: HashSet<String>,
    following: bool,
    unread: usize,
}

impl Default for Presence {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE_CAP)
    }
}

impl Presence {
    /// Create an empty projection keeping at most `cap` messages.
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            messages: VecDeque::new(),
            users: Vec::new(),
            typing: HashSet::new(),
            following: true,
            unread: 0,
        }
    }

    /// Fold one server event into the view.
    pub fn apply(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::History(history) => {
                let skip = history.len().saturating_sub(self.cap);
                self.messages = history.into_iter().skip(skip).collect();
            },
            ServerEvent::NewMessage(message) => {
                self.messages.push_back(message);
                while self.messages.len() > self.cap {
                    self.messages.pop_front();
                }
                if !self.following {
                    self.unread += 1;
                }
            },
            ServerEvent::UserList(users) => {
                self.typing.retain(|id| users.iter().any(|u| &u.user_id == id));
                self.users = users;
            },
            ServerEvent::Typing(payload) => {
                if payload.is_typing {
                    self.typing.insert(payload.user_id);
                } else {
                    self.typing.remove(&payload.user_id);
                }
            },
        }
    }

    /// Messages, oldest first.
    pub fn messages(&self) -> impl ExactSizeIterator<Item = &Message> {
        self.messages.iter()
    }

    /// Online users in server order.
    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Whether `user_id` is flagged as typing.
    pub fn is_typing(&self, user_id: &str) -> bool {
        self.typing.contains(user_id)
    }

    /// Online users currently typing, excluding `own_id`.
    pub fn typing_users(&self, own_id: &str) -> Vec<&User> {
        self.users
            .iter()
            .filter(|u| u.user_id != own_id && self.typing.contains(&u.user_id))
            .collect()
    }

    /// Whether the viewer is following the newest messages.
    pub fn is_following(&self) -> bool {
        self.following
    }

    /// Record whether the viewer is following the newest messages.
    ///
    /// Following again marks everything read.
    pub fn set_following(&mut self, following: bool) {
        self.following = following;
        if following {
            self.unread = 0;
        }
    }

    /// New messages received while not following.
    pub fn unread(&self) -> usize {
        self.unread
    }

    /// Forget everything. Used when the session restarts.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.users.clear();
        self.typing.clear();
        self.unread = 0;
    }
}

/// Whether `message` was written by the user called `username`.
pub fn is_own(message: &Message, username: Option<&str>) -> bool {
    !message.is_system() && username.is_some_and(|name| message.sender == name)
}

#[cfg(test)]
mod tests {
    use chatline_proto::TypingPayload;

    use super::*;

    fn message(n: usize) -> Message {
        Message {
            id: format!("m-{n}"),
            text: format!("message {n}"),
            sender: "ada".to_string(),
            timestamp: n as u64,
        }
    }

    fn user(id: &str) -> User {
        User { user_id: id.to_string(), username: id.to_uppercase(), socket_id: format!("s-{id}") }
    }

    fn typing(id: &str, is_typing: bool) -> ServerEvent {
        ServerEvent::Typing(TypingPayload { user_id: id.to_string(), is_typing })
    }

    #[test]
    fn history_keeps_newest() {
        let mut presence = Presence::new(3);
        presence.apply(ServerEvent::History((0..5).map(message).collect()));

        let ids: Vec<_> = presence.messages().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m-2", "m-3", "m-4"]);
    }

    #[test]
    fn new_message_evicts_oldest() {
        let mut presence = Presence::default();
        presence.apply(ServerEvent::History((0..100).map(message).collect()));
        presence.apply(ServerEvent::NewMessage(message(100)));

        assert_eq!(presence.messages().len(), 100);
        assert_eq!(presence.messages().next().map(|m| m.id.as_str()), Some("m-1"));
        assert_eq!(presence.messages().last().map(|m| m.id.as_str()), Some("m-100"));
    }

    #[test]
    fn typing_users_excludes_self_and_offline() {
        let mut presence = Presence::default();
        presence.apply(ServerEvent::UserList(vec![user("a"), user("b"), user("me")]));
        presence.apply(typing("a", true));
        presence.apply(typing("me", true));
        presence.apply(typing("ghost", true));

        let typing_users = presence.typing_users("me");
        let names: Vec<_> = typing_users.iter().map(|u| u.user_id.as_str()).collect();
        assert_eq!(names, vec!["a"]);

        presence.apply(typing("a", false));
        assert!(presence.typing_users("me").is_empty());
    }

    #[test]
    fn user_list_prunes_typing_flags() {
        let mut presence = Presence::default();
        presence.apply(ServerEvent::UserList(vec![user("a"), user("b")]));
        presence.apply(typing("b", true));

        presence.apply(ServerEvent::UserList(vec![user("a")]));
        assert!(!presence.is_typing("b"));

        presence.apply(ServerEvent::UserList(vec![user("a"), user("b")]));
        assert!(presence.typing_users("a").is_empty());
    }

    #[test]
    fn unread_counts_only_while_not_following() {
        let mut presence = Presence::default();
        presence.apply(ServerEvent::NewMessage(message(0)));
        assert_eq!(presence.unread(), 0);

        presence.set_following(false);
        presence.apply(ServerEvent::NewMessage(message(1)));
        presence.apply(ServerEvent::NewMessage(message(2)));
        assert_eq!(presence.unread(), 2);

        presence.set_following(true);
        assert_eq!(presence.unread(), 0);
    }

    #[test]
    fn own_and_system_messages() {
        let mine = message(0);
        let notice = Message { sender: "system".to_string(), ..message(1) };

        assert!(is_own(&mine, Some("ada")));
        assert!(!is_own(&mine, Some("bob")));
        assert!(!is_own(&mine, None));
        assert!(notice.is_system());
        assert!(!is_own(&notice, Some("system")));
    }
}
