// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hooks installed by default.
//!
//! - `load` never bubbles, so a triggered image `load` does not reach the
//!   window's `load` handlers.
//! - `beforeunload` copies a handler result into the native `returnValue`,
//!   which tells the host to cancel the unload.
//! - `focus`/`blur` delegate as `focusin`/`focusout`; triggering them moves
//!   real focus through the host, and the native focus events run the
//!   handlers.
//! - `mouseenter`/`mouseleave`/`pointerenter`/`pointerleave` are emulated on
//!   top of their bubbling `over`/`out` counterparts.

use alloc::rc::Rc;
use alloc::string::ToString;

use crate::handler::HandlerOutput;
use crate::hook::{Hook, HookRegistry, Verdict};
use crate::host::{Host, NodeKey, contains};

const ENTER_LEAVE: [(&str, &str); 4] = [
    ("mouseenter", "mouseover"),
    ("mouseleave", "mouseout"),
    ("pointerenter", "pointerover"),
    ("pointerleave", "pointerout"),
];

/// Registers the built-in hooks for every type that has no hook yet.
pub fn install<K: NodeKey>(hooks: &HookRegistry<K>, host: &Rc<dyn Host<K>>) {
    let register = |ty: &str, hook: Hook<K>| {
        if hooks.get(ty).is_none() {
            hooks.register(ty, hook);
        }
    };

    register("load", Hook::new().no_bubble());

    register(
        "beforeunload",
        Hook::new().on_post_dispatch(|_, event| {
            if let Some(result) = event.result().cloned()
                && let Some(native) = event.original_event()
            {
                native.set("returnValue", result);
                native.prevent_default();
            }
        }),
    );

    let focus_host = host.clone();
    register(
        "focus",
        Hook::new()
            .delegate_as("focusin")
            .on_trigger(move |target, _, _| {
                if focus_host.active_element() != Some(target)
                    && focus_host.perform_default(target, "focus")
                {
                    Verdict::Veto
                } else {
                    Verdict::Proceed
                }
            }),
    );

    let blur_host = host.clone();
    register(
        "blur",
        Hook::new()
            .delegate_as("focusout")
            .on_trigger(move |target, _, _| {
                if blur_host.active_element() == Some(target)
                    && blur_host.perform_default(target, "blur")
                {
                    Verdict::Veto
                } else {
                    Verdict::Proceed
                }
            }),
    );

    for (orig, fix) in ENTER_LEAVE {
        let tree = host.clone();
        register(
            orig,
            Hook::new()
                .bind_as(fix)
                .delegate_as(fix)
                .on_handle(move |event, entry, args| {
                    // Moves within the bound element are not enter/leave.
                    let within = match (event.related_target(), event.current_target()) {
                        (Some(related), Some(current)) => {
                            related == current || contains(&*tree, current, related)
                        }
                        _ => false,
                    };
                    if within {
                        return HandlerOutput::NONE;
                    }
                    let delivered = event.ty().to_string();
                    event.set_type(entry.orig_type());
                    let output = entry.invoke(event, args);
                    event.set_type(delivered);
                    output
                }),
        );
    }
}
