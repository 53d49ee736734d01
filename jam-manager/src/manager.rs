//! The message manager: area-aware post/read/scan operations layered
//! over [`jam_base::Base`] (component C2).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use jam_base::Base;
use jam_types::{
    Area, AreaKind, Attribute, Attribute2, FtnAddress, LastReadRecord, Message, MessageDraft,
    MessageHeader, Subfield,
};

use crate::error::{ManagerError, ManagerResult};
use crate::kludge::{compose_body, display_body, generate_msgid};
use crate::link;

/// Opens and caches JAM bases by area tag, and holds the area registry.
#[derive(Debug)]
pub struct Manager {
    local_address: FtnAddress,
    areas: Mutex<Vec<Area>>,
    bases: Mutex<HashMap<String, Arc<Base>>>,
}

impl Manager {
    pub fn new(local_address: FtnAddress, areas: Vec<Area>) -> Self {
        Self {
            local_address,
            areas: Mutex::new(areas),
            bases: Mutex::new(HashMap::new()),
        }
    }

    pub fn list_areas(&self) -> Vec<Area> {
        crate::registry::sorted(self.areas.lock().unwrap().clone())
    }

    pub fn area(&self, tag: &str) -> Option<Area> {
        self.areas.lock().unwrap().iter().find(|a| a.tag == tag).cloned()
    }

    /// Returns the area's open `Base`, creating it on first use (spec.md
    /// §3.5 "Bases are created by the Message Manager on first use").
    pub fn base_for(&self, tag: &str) -> ManagerResult<Arc<Base>> {
        let area = self.area(tag).ok_or_else(|| ManagerError::UnknownArea(tag.to_string()))?;

        let mut bases = self.bases.lock().unwrap();
        if let Some(base) = bases.get(tag) {
            return Ok(Arc::clone(base));
        }

        let base = match Base::open(&area.base_path) {
            Ok(base) => base,
            Err(jam_base::BaseError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Base::create(&area.base_path, 1)?
            }
            Err(e) => return Err(e.into()),
        };
        let base = Arc::new(base);
        bases.insert(tag.to_string(), Arc::clone(&base));
        Ok(base)
    }

    pub fn post_message(&self, area_tag: &str, draft: MessageDraft) -> ManagerResult<u32> {
        let area = self.area(area_tag).ok_or_else(|| ManagerError::UnknownArea(area_tag.to_string()))?;
        if draft.to.as_str().trim().is_empty() {
            return Err(ManagerError::InvalidRecipient);
        }
        if draft.body.trim().is_empty() {
            return Err(ManagerError::EmptyBody);
        }
        if area.write_acs == "none" {
            return Err(ManagerError::AreaReadOnly(area_tag.to_string()));
        }

        let date_written = Utc::now().timestamp() as u32;
        let is_echo = area.kind == AreaKind::Echo;

        let body = compose_body(
            &draft.body,
            if is_echo {
                Some((area.origin_line.as_deref().unwrap_or(""), &self.local_address))
            } else {
                None
            },
        );

        let msgid = generate_msgid(&self.local_address, draft.from.as_str(), draft.subject.as_str(), date_written);
        let mut subfields = vec![
            Subfield::SenderName(draft.from.as_str().as_bytes().to_vec()),
            Subfield::ReceiverName(draft.to.as_str().as_bytes().to_vec()),
            Subfield::Subject(draft.subject.as_str().as_bytes().to_vec()),
            Subfield::MsgId(msgid.as_bytes().to_vec()),
        ];
        if let Some(reply_id) = &draft.reply_id {
            subfields.push(Subfield::ReplyId(reply_id.as_bytes().to_vec()));
        }
        if area.network_tag.is_some() {
            subfields.push(Subfield::OAddress(self.local_address.to_string().into_bytes()));
        }

        let mut attribute = Attribute::LOCAL;
        if draft.private {
            attribute |= Attribute::PRIVATE;
        }

        let hdr = MessageHeader {
            revision: 1,
            reserved: 0,
            times_read: 0,
            msgid_crc: 0,
            reply_to_msgid_crc: 0,
            password_crc: 0,
            date_written,
            date_received: 0,
            date_processed: 0,
            msgnum: 0,
            attribute,
            attribute2: Attribute2::empty(),
            offset: 0,
            txt_len: 0,
            password_crc2: 0,
            cost: 0,
            reply_to: 0,
            reply_1st: 0,
            reply_next: 0,
            subfields,
        };

        let base = self.base_for(area_tag)?;
        let msgnum = base.post(hdr, body.as_bytes())?;
        Ok(msgnum)
    }

    pub fn read_message(&self, area_tag: &str, msgnum: u32) -> ManagerResult<Message> {
        let base = self.base_for(area_tag)?;
        let header = base.read_header(msgnum)?;
        let text = base.read_text(&header)?;
        Ok(Message {
            body: display_body(&text),
            header,
        })
    }

    /// Non-deleted messages with `msgnum > LastReadMsg` for `user_handle`,
    /// in ascending msgnum order (spec.md §4.2 "ListNew").
    pub fn list_new(&self, area_tag: &str, user_handle: &str) -> ManagerResult<Vec<Message>> {
        let base = self.base_for(area_tag)?;
        let last_read = base.get_last_read(user_handle).map(|r| r.last_read_msg).unwrap_or(0);
        let headers = base.scan_headers(last_read + 1, usize::MAX)?;
        headers
            .into_iter()
            .map(|header| {
                let text = base.read_text(&header)?;
                Ok(Message {
                    body: display_body(&text),
                    header,
                })
            })
            .collect()
    }

    pub fn mark_read(&self, area_tag: &str, user_handle: &str, msgnum: u32) -> ManagerResult<()> {
        let base = self.base_for(area_tag)?;
        let mut record = base
            .get_last_read(user_handle)
            .unwrap_or_else(|_| LastReadRecord::new(jam_codec::crc::crc32_lowercase(user_handle), 0));
        record.mark_read(msgnum);
        base.set_last_read(user_handle, record)?;
        Ok(())
    }

    pub fn rebuild_threads(&self, area_tag: &str) -> ManagerResult<usize> {
        let base = self.base_for(area_tag)?;
        link::rebuild_threads(&base)
    }

    /// Appends `header`/`text` to `area_tag`'s base verbatim, without
    /// the tearline/origin/kludge injection `post_message` performs for
    /// locally drafted messages. The tosser uses this to preserve a
    /// foreign message's own MSGID and body byte-for-byte on import.
    pub fn import_message(&self, area_tag: &str, header: MessageHeader, text: &[u8]) -> ManagerResult<u32> {
        let base = self.base_for(area_tag)?;
        Ok(base.post(header, text)?)
    }
}
