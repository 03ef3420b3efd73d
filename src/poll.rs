//! Polling capability.
//!
//! ginput never waits on file descriptors itself. Every device that needs
//! readiness notification is registered with a [`Poller`] under a [`Token`], and
//! the host's reactor reports results back as [`Completion`]s, either by calling
//! `Manager::complete` directly or by buffering them for
//! [`Poller::take_completions`], which `Manager::periodic_task` drains.
//!
//! Removing a token from the poller must guarantee that no completion for it is
//! delivered afterwards; device close paths rely on that ordering.

use crate::error::{Error, Result};
use bitflags::bitflags;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::rc::Rc;

/// Owner of a registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Hid,
    Mkb,
    Joystick,
}

/// Registration key: which subsystem owns it and the slot inside that subsystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub slot: usize,
}

impl Token {
    pub fn new(kind: TokenKind, slot: usize) -> Self {
        Self { kind, slot }
    }
}

bitflags! {
    /// Notifications a registration is interested in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Interest: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const CLOSE = 1 << 2;
    }
}

/// Result of an asynchronous operation, or a close notification.
#[derive(Debug)]
pub enum Completion {
    /// A read finished. An empty buffer means end of stream.
    Read {
        token: Token,
        result: io::Result<Vec<u8>>,
    },
    Write {
        token: Token,
        result: io::Result<usize>,
    },
    Closed {
        token: Token,
    },
}

impl Completion {
    pub fn token(&self) -> Token {
        match self {
            Completion::Read { token, .. }
            | Completion::Write { token, .. }
            | Completion::Closed { token } => *token,
        }
    }
}

/// Readiness registration hooks supplied by the host.
pub trait Poller {
    fn register(&mut self, token: Token, interest: Interest) -> Result<()>;

    fn remove(&mut self, token: Token) -> Result<()>;

    /// Completions buffered by the poller itself since the last call.
    fn take_completions(&mut self) -> Vec<Completion> {
        Vec::new()
    }
}

/// Shared FIFO of completions, fed by transports that complete in-process.
#[derive(Clone, Debug, Default)]
pub struct CompletionQueue(Rc<RefCell<VecDeque<Completion>>>);

impl CompletionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, completion: Completion) {
        self.0.borrow_mut().push_back(completion);
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    fn drain(&self) -> Vec<Completion> {
        self.0.borrow_mut().drain(..).collect()
    }
}

/// In-process reactor: keeps the registration table and hands back whatever
/// was pushed on its [`CompletionQueue`], minus completions for tokens that are
/// no longer registered.
#[derive(Debug, Default)]
pub struct LocalReactor {
    registered: HashMap<Token, Interest>,
    completions: CompletionQueue,
}

impl LocalReactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for producers of completions.
    pub fn completions(&self) -> CompletionQueue {
        self.completions.clone()
    }

    pub fn is_registered(&self, token: Token) -> bool {
        self.registered.contains_key(&token)
    }

    pub fn registered_count(&self) -> usize {
        self.registered.len()
    }
}

impl Poller for LocalReactor {
    fn register(&mut self, token: Token, interest: Interest) -> Result<()> {
        if interest.is_empty() {
            return Err(Error::MissingHook("poll interest"));
        }
        self.registered.insert(token, interest);
        Ok(())
    }

    fn remove(&mut self, token: Token) -> Result<()> {
        self.registered
            .remove(&token)
            .map(|_| ())
            .ok_or(Error::UnknownToken(token))
    }

    fn take_completions(&mut self) -> Vec<Completion> {
        self.completions
            .drain()
            .into_iter()
            .filter(|c| self.registered.contains_key(&c.token()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completions_for_removed_tokens_are_dropped() {
        let mut reactor = LocalReactor::new();
        let a = Token::new(TokenKind::Hid, 0);
        let b = Token::new(TokenKind::Hid, 1);
        reactor.register(a, Interest::READ).unwrap();
        reactor.register(b, Interest::READ).unwrap();

        let q = reactor.completions();
        q.push(Completion::Read {
            token: a,
            result: Ok(vec![1]),
        });
        q.push(Completion::Closed { token: b });
        reactor.remove(b).unwrap();

        let got = reactor.take_completions();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].token(), a);
        assert!(q.is_empty());
    }

    #[test]
    fn removing_unknown_token_fails() {
        let mut reactor = LocalReactor::new();
        let t = Token::new(TokenKind::Mkb, 3);
        assert!(matches!(reactor.remove(t), Err(Error::UnknownToken(_))));
    }
}
