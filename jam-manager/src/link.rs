//! Reply-thread linking (spec.md §4.2 "Thread linking algorithm").

use std::collections::HashMap;

use jam_base::Base;
use jam_types::MessageHeader;

use crate::error::ManagerResult;

fn msgid_str(hdr: &MessageHeader) -> Option<String> {
    hdr.msgid().map(|sf| sf.as_str().into_owned())
}

fn reply_id_str(hdr: &MessageHeader) -> Option<String> {
    hdr.reply_id().map(|sf| sf.as_str().into_owned())
}

/// An FTN `MSGID`/`REPLY` kludge is normally `<address> <serial>`.
/// Returns just the address part, used as a fallback index for
/// foreign tossers that emit `REPLY` without the serial (spec.md §9
/// "Open questions"). When the value has no serial at all — the bare
/// `<address>` case the fallback exists for — it has no space to
/// split on, so the whole string already is the address.
fn address_prefix(msgid: &str) -> &str {
    msgid.split_once(' ').map(|(addr, _)| addr).unwrap_or(msgid)
}

/// Rebuilds `ReplyTo`/`Reply1st`/`ReplyNext` for every non-deleted
/// header in `base`. Returns the number of headers whose threading
/// fields changed. Idempotent: a second call after convergence reports
/// zero (spec.md §8.11).
pub fn rebuild_threads(base: &Base) -> ManagerResult<usize> {
    let headers = base.scan_headers(0, usize::MAX)?;

    let mut msgid_to_num: HashMap<String, u32> = HashMap::new();
    let mut addr_to_num: HashMap<String, u32> = HashMap::new();
    // Ascending-msgnum order is preserved because `headers` already is.
    let mut replyid_to_nums: HashMap<String, Vec<u32>> = HashMap::new();
    let mut replyaddr_to_nums: HashMap<String, Vec<u32>> = HashMap::new();

    for hdr in &headers {
        if let Some(msgid) = msgid_str(hdr) {
            msgid_to_num.entry(msgid.clone()).or_insert(hdr.msgnum);
            addr_to_num
                .entry(address_prefix(&msgid).to_string())
                .or_insert(hdr.msgnum);
        }
        if let Some(reply_id) = reply_id_str(hdr) {
            replyid_to_nums.entry(reply_id.clone()).or_default().push(hdr.msgnum);
            replyaddr_to_nums
                .entry(address_prefix(&reply_id).to_string())
                .or_default()
                .push(hdr.msgnum);
        }
    }

    // Children of a parent MsgID/ReplyID, ascending by msgnum. The
    // address-prefix fallback is consulted only when no message holds
    // an exact match — folding it in unconditionally would group every
    // message replying anywhere under our own address into one set,
    // since they all share the same address prefix (spec.md §9).
    let children_of = |reply_id: &str| -> Vec<u32> {
        let mut nums = match replyid_to_nums.get(reply_id) {
            Some(nums) if !nums.is_empty() => nums.clone(),
            _ => replyaddr_to_nums
                .get(address_prefix(reply_id))
                .cloned()
                .unwrap_or_default(),
        };
        nums.sort_unstable();
        nums.dedup();
        nums
    };

    let mut updated = 0;
    for hdr in headers {
        let mut new_hdr = hdr.clone();

        new_hdr.reply_to = reply_id_str(&hdr)
            .and_then(|reply_id| {
                msgid_to_num
                    .get(&reply_id)
                    .or_else(|| addr_to_num.get(address_prefix(&reply_id)))
            })
            .copied()
            .unwrap_or(0);

        new_hdr.reply_1st = msgid_str(&hdr)
            .map(|msgid| children_of(&msgid))
            .and_then(|children| children.first().copied())
            .unwrap_or(0);

        new_hdr.reply_next = reply_id_str(&hdr)
            .map(|reply_id| children_of(&reply_id))
            .and_then(|siblings| {
                let pos = siblings.iter().position(|&n| n == hdr.msgnum)?;
                siblings.get(pos + 1).copied()
            })
            .unwrap_or(0);

        if new_hdr != hdr {
            base.update_header(hdr.msgnum, &new_hdr)?;
            updated += 1;
        }
    }

    Ok(updated)
}
