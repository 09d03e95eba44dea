//! Typed request/response messages.
//!
//! A message is `(namespace, id, header dictionary, up to 16 typed args)`.
//! The header carries correlation fields (client id, context id, function
//! tag), a timestamp and the not-last marker for multi-part responses.

use gavf_io::IoStream;
use gavf_value::{Array, Dictionary, Value};

use crate::packet::Packet;
use crate::serialize::{read_value, write_dictionary, write_value, read_dictionary};
use crate::time::TIME_UNDEFINED;
use crate::{meta, Error, Result};

/// Maximum number of arguments a message can carry.
pub const MAX_ARGS: usize = 16;

/* Header field names */
pub const HEADER_ID: &str = "ID";
pub const HEADER_NS: &str = "NS";
pub const HEADER_CLIENT_ID: &str = "ClientID";
pub const HEADER_CONTEXT_ID: &str = "ContextID";
pub const HEADER_TIMESTAMP: &str = "TS";
pub const HEADER_NOT_LAST: &str = "NotLast";
pub const HEADER_FUNCTION_TAG: &str = "FunctionTag";

/* Namespaces */
pub const NS_LOG: u32 = 1;
pub const NS_GENERIC: u32 = 2;
pub const NS_SRC: u32 = 3;
pub const NS_GUI: u32 = 4;
pub const NS_GAVF: u32 = 5;
pub const NS_STATE: u32 = 6;
pub const NS_SINK: u32 = 7;

/* Generic namespace */
pub const CMD_QUIT: u32 = 1;
/// Answered with [`MSG_PONG`]; keeps connections alive.
pub const CMD_PING: u32 = 2;
pub const MSG_QUIT: u32 = 100;
pub const MSG_PONG: u32 = 101;
/// arg0: percentage (0.0..1.0), arg1: activity (string)
pub const MSG_PROGRESS: u32 = 101;
pub const MSG_RESOURCE_ADDED: u32 = 102;
pub const MSG_RESOURCE_DELETED: u32 = 103;
pub const CMD_SET_RESOURCE: u32 = 104;

/* Source namespace */
/// arg0: variables to append to the uri on restart (dictionary)
pub const MSG_SRC_RESTART_VARS: u32 = 1;
/// arg0: time, arg1: scale, arg2: stream, arg3/4: new pixel size
pub const MSG_SRC_ASPECT_CHANGED: u32 = 2;
/// arg0: percentage (float), negative = buffering finished
pub const MSG_SRC_BUFFERING: u32 = 3;
/// arg0: context string (e.g. domain name)
pub const MSG_SRC_AUTHENTICATE: u32 = 4;
pub const MSG_SRC_SKIP_MODE_CHANGED: u32 = 5;
/// arg0: track with the actual formats (dictionary)
pub const MSG_SRC_STARTED: u32 = 6;
/// arg0: pts, arg1: scale, arg2: discard, arg3: discontinuous
pub const MSG_SRC_RESYNC: u32 = 7;
/// The source metadata changed; arg0: new metadata (dictionary)
pub const MSG_SRC_METADATA_CHANGED: u32 = 8;

pub const CMD_SRC_AUTHENTICATE: u32 = 101;
/// arg0: track index
pub const CMD_SRC_SELECT_TRACK: u32 = 102;
/// arg0: time (long), arg1: scale (int), arg2: unit (int)
pub const CMD_SRC_SEEK: u32 = 103;
pub const CMD_SRC_START: u32 = 105;
pub const CMD_SRC_PAUSE: u32 = 106;
pub const CMD_SRC_RESUME: u32 = 107;
/// arg0: stream type, arg1: index, arg2: enable
pub const CMD_SRC_SET_STREAM_ACTION: u32 = 109;
/// arg0: audio storage, arg1: video storage
pub const CMD_SRC_SET_FRAME_STORAGE: u32 = 110;

/* GUI namespace */
pub const MSG_GUI_KEY_PRESS: u32 = 1;
pub const MSG_GUI_KEY_RELEASE: u32 = 2;
pub const MSG_GUI_BUTTON_PRESS: u32 = 3;
pub const MSG_GUI_BUTTON_RELEASE: u32 = 4;
pub const MSG_GUI_BUTTON_DOUBLECLICK: u32 = 5;
pub const MSG_GUI_MOUSE_MOTION: u32 = 6;
pub const MSG_GUI_ACCEL: u32 = 7;
pub const MSG_GUI_WINDOW_COORDS: u32 = 8;
pub const MSG_GUI_SWIPE: u32 = 9;

pub const GUI_SWIPE_UP: i32 = 1;
pub const GUI_SWIPE_DOWN: i32 = 2;
pub const GUI_SWIPE_LEFT: i32 = 3;
pub const GUI_SWIPE_RIGHT: i32 = 4;

/* GAVF namespace: low-level packet flow control. Downstream these ride
as packets of the reserved msg stream; upstream they are sent raw. */
pub const MSG_GAVF_MEDIA_INFO: u32 = 1;
pub const MSG_GAVF_SEEK: u32 = 5;
pub const MSG_GAVF_SELECT_TRACK: u32 = 6;
pub const MSG_GAVF_EOF: u32 = 7;
pub const MSG_GAVF_READY: u32 = 8;
pub const MSG_GAVF_START: u32 = 9;
pub const CMD_GAVF_SELECT_STREAM: u32 = 0x100 + 1;

/* Sink namespace */
pub const MSG_SINK_UNDERRUN: u32 = 1;

/// A typed message.
#[derive(Debug, Clone, PartialEq)]
pub struct Msg {
    pub header: Dictionary,
    pub ns: u32,
    pub id: u32,
    args: [Value; MAX_ARGS],
    num_args: usize,
}

impl Default for Msg {
    fn default() -> Self {
        Self {
            header: Dictionary::new(),
            ns: 0,
            id: 0,
            args: std::array::from_fn(|_| Value::Undefined),
            num_args: 0,
        }
    }
}

impl Msg {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a message with namespace and id set.
    pub fn with_id(ns: u32, id: u32) -> Self {
        let mut msg = Self::new();
        msg.set_id(ns, id);
        msg
    }

    /// Set namespace and id, clearing previous args.
    pub fn set_id(&mut self, ns: u32, id: u32) {
        self.ns = ns;
        self.id = id;
        for arg in &mut self.args {
            arg.reset();
        }
        self.num_args = 0;
    }

    pub fn get_id(&self) -> (u32, u32) {
        (self.ns, self.id)
    }

    pub fn matches(&self, ns: u32, id: u32) -> bool {
        self.ns == ns && self.id == id
    }

    pub fn num_args(&self) -> usize {
        self.num_args
    }

    /// Set argument `idx`; grows the live count. False if out of range.
    pub fn set_arg(&mut self, idx: usize, val: Value) -> bool {
        if idx >= MAX_ARGS {
            return false;
        }
        self.args[idx] = val;
        if idx >= self.num_args {
            self.num_args = idx + 1;
        }
        true
    }

    pub fn arg(&self, idx: usize) -> Option<&Value> {
        (idx < self.num_args).then(|| &self.args[idx])
    }

    pub fn set_arg_int(&mut self, idx: usize, val: i32) -> bool {
        self.set_arg(idx, Value::Int(val))
    }

    pub fn arg_int(&self, idx: usize) -> Option<i32> {
        self.arg(idx)?.get_int()
    }

    pub fn set_arg_long(&mut self, idx: usize, val: i64) -> bool {
        self.set_arg(idx, Value::Long(val))
    }

    pub fn arg_long(&self, idx: usize) -> Option<i64> {
        self.arg(idx)?.get_long()
    }

    pub fn set_arg_float(&mut self, idx: usize, val: f64) -> bool {
        self.set_arg(idx, Value::Float(val))
    }

    pub fn arg_float(&self, idx: usize) -> Option<f64> {
        self.arg(idx)?.get_float()
    }

    pub fn set_arg_string(&mut self, idx: usize, val: &str) -> bool {
        self.set_arg(idx, Value::from(val))
    }

    pub fn arg_string(&self, idx: usize) -> Option<&str> {
        self.arg(idx)?.as_str()
    }

    pub fn set_arg_dictionary(&mut self, idx: usize, val: Dictionary) -> bool {
        self.set_arg(idx, Value::Dictionary(val))
    }

    pub fn arg_dictionary(&self, idx: usize) -> Option<&Dictionary> {
        self.arg(idx)?.as_dictionary()
    }

    pub fn set_arg_array(&mut self, idx: usize, val: Array) -> bool {
        self.set_arg(idx, Value::Array(val))
    }

    pub fn arg_array(&self, idx: usize) -> Option<&Array> {
        self.arg(idx)?.as_array()
    }

    pub fn set_arg_position(&mut self, idx: usize, val: [f64; 2]) -> bool {
        self.set_arg(idx, Value::Position(val))
    }

    pub fn arg_position(&self, idx: usize) -> Option<[f64; 2]> {
        self.arg(idx)?.as_position().copied()
    }

    /* Header helpers */

    pub fn set_client_id(&mut self, id: &str) {
        self.header.set_string(HEADER_CLIENT_ID, id);
    }

    pub fn client_id(&self) -> Option<&str> {
        self.header.get_string(HEADER_CLIENT_ID)
    }

    pub fn set_context_id(&mut self, id: &str) {
        self.header.set_string(HEADER_CONTEXT_ID, id);
    }

    pub fn context_id(&self) -> Option<&str> {
        self.header.get_string(HEADER_CONTEXT_ID)
    }

    pub fn set_function_tag(&mut self, tag: &str) {
        self.header.set_string(HEADER_FUNCTION_TAG, tag);
    }

    pub fn function_tag(&self) -> Option<&str> {
        self.header.get_string(HEADER_FUNCTION_TAG)
    }

    pub fn set_timestamp(&mut self, t: i64) {
        self.header.set_long(HEADER_TIMESTAMP, t);
    }

    pub fn timestamp(&self) -> i64 {
        self.header.get_long(HEADER_TIMESTAMP).unwrap_or(TIME_UNDEFINED)
    }

    /// Mark whether more messages follow. Single messages are last by
    /// default, so only the not-last case lands in the header.
    pub fn set_last(&mut self, last: bool) {
        if last {
            self.header.remove(HEADER_NOT_LAST);
        } else {
            self.header.set_int(HEADER_NOT_LAST, 1);
        }
    }

    pub fn get_last(&self) -> bool {
        self.header.get_int(HEADER_NOT_LAST).unwrap_or(0) == 0
    }

    /// Copy one header field from `src`, deleting it when absent there.
    pub fn copy_header_field(&mut self, src: &Msg, key: &str) {
        match src.header.get(key) {
            Some(val) => {
                self.header.set(key, val.clone());
            }
            None => {
                self.header.remove(key);
            }
        }
    }

    /// Correlate a response with its request: client id, context id and
    /// function tag travel back, nothing else.
    pub fn set_resp_for_req(&mut self, req: &Msg) {
        self.copy_header_field(req, HEADER_CLIENT_ID);
        self.copy_header_field(req, HEADER_CONTEXT_ID);
        self.copy_header_field(req, HEADER_FUNCTION_TAG);
    }

    /// Restore namespace and id from the header after a read.
    pub fn apply_header(&mut self) {
        if let Some(ns) = self.header.get_int(HEADER_NS) {
            self.ns = ns as u32;
        }
        if let Some(id) = self.header.get_int(HEADER_ID) {
            self.id = id as u32;
        }
    }

    /* Wire form: header dictionary (NS/ID applied), then the args. */

    pub fn write(&self, io: &mut IoStream) -> Result<()> {
        let mut header = self.header.clone();
        header.set_int(HEADER_NS, self.ns as i32);
        header.set_int(HEADER_ID, self.id as i32);
        write_dictionary(io, &header)?;
        io.write_u32v(self.num_args as u32)?;
        for arg in &self.args[..self.num_args] {
            write_value(io, arg)?;
        }
        Ok(())
    }

    pub fn read(io: &mut IoStream) -> Result<Msg> {
        let mut msg = Msg::new();
        msg.header = read_dictionary(io)?;
        msg.apply_header();
        let num_args = io.read_u32v()? as usize;
        if num_args > MAX_ARGS {
            return Err(Error::Parse(format!("message with {num_args} args")));
        }
        for idx in 0..num_args {
            let val = read_value(io)?;
            msg.set_arg(idx, val);
        }
        Ok(msg)
    }

    pub fn to_buffer(&self) -> Result<Vec<u8>> {
        let mut io = gavf_io::mem::write();
        self.write(&mut io)?;
        io.take_buffer()
            .map(gavf_value::Buffer::into_vec)
            .ok_or_else(|| Error::Parse("memory sink lost its buffer".into()))
    }

    pub fn from_buffer(data: &[u8]) -> Result<Msg> {
        let mut io = gavf_io::mem::read(data.to_vec());
        Self::read(&mut io)
    }

    /// Pack into a packet on the reserved GAVF message stream.
    pub fn to_packet(&self) -> Result<Packet> {
        let mut p = Packet::new();
        p.id = meta::META_STREAM_ID_MSG_GAVF;
        p.pts = self.timestamp();
        p.set_data(&self.to_buffer()?)?;
        Ok(p)
    }

    /// Unpack from a packet of the reserved GAVF message stream.
    pub fn from_packet(p: &Packet) -> Result<Msg> {
        Self::from_buffer(p.data())
    }
}

/* Conventional messages */

/// Progress report: activity name plus completion in 0.0..1.0.
pub fn set_progress(msg: &mut Msg, activity: &str, perc: f64) {
    msg.set_id(NS_GENERIC, MSG_PROGRESS);
    msg.set_arg_float(0, perc);
    msg.set_arg_string(1, activity);
}

pub fn get_progress(msg: &Msg) -> (Option<&str>, f64) {
    (msg.arg_string(1), msg.arg_float(0).unwrap_or(0.0))
}

pub fn set_src_aspect(msg: &mut Msg, time: i64, scale: i32, stream: i32, pixel_width: i32, pixel_height: i32) {
    msg.set_id(NS_SRC, MSG_SRC_ASPECT_CHANGED);
    msg.set_arg_long(0, time);
    msg.set_arg_int(1, scale);
    msg.set_arg_int(2, stream);
    msg.set_arg_int(3, pixel_width);
    msg.set_arg_int(4, pixel_height);
}

pub fn set_src_buffering(msg: &mut Msg, perc: f64) {
    msg.set_id(NS_SRC, MSG_SRC_BUFFERING);
    msg.set_arg_float(0, perc);
}

pub fn get_src_buffering(msg: &Msg) -> f64 {
    msg.arg_float(0).unwrap_or(-1.0)
}

pub fn set_src_authenticate(msg: &mut Msg, context: &str) {
    msg.set_id(NS_SRC, MSG_SRC_AUTHENTICATE);
    msg.set_arg_string(0, context);
}

pub fn set_src_seek(msg: &mut Msg, time: i64, scale: i32) {
    msg.set_id(NS_SRC, CMD_SRC_SEEK);
    msg.set_arg_long(0, time);
    msg.set_arg_int(1, scale);
}

pub fn get_src_seek(msg: &Msg) -> (i64, i32) {
    (
        msg.arg_long(0).unwrap_or(0),
        msg.arg_int(1).unwrap_or(0),
    )
}

pub fn set_src_resync(msg: &mut Msg, time: i64, scale: i32, discard: bool, discont: bool) {
    msg.set_id(NS_SRC, MSG_SRC_RESYNC);
    msg.set_arg_long(0, time);
    msg.set_arg_int(1, scale);
    msg.set_arg_int(2, i32::from(discard));
    msg.set_arg_int(3, i32::from(discont));
}

pub fn get_src_resync(msg: &Msg) -> (i64, i32, bool, bool) {
    (
        msg.arg_long(0).unwrap_or(0),
        msg.arg_int(1).unwrap_or(0),
        msg.arg_int(2).unwrap_or(0) != 0,
        msg.arg_int(3).unwrap_or(0) != 0,
    )
}

fn set_gui_event(msg: &mut Msg, id: u32, arg0: i32, mask: i32, x: i32, y: i32, pos: [f64; 2]) {
    msg.set_id(NS_GUI, id);
    msg.set_arg_int(0, arg0);
    msg.set_arg_int(1, mask);
    msg.set_arg_int(2, x);
    msg.set_arg_int(3, y);
    msg.set_arg_position(4, pos);
}

pub fn set_gui_button_press(msg: &mut Msg, button: i32, mask: i32, x: i32, y: i32, pos: [f64; 2]) {
    set_gui_event(msg, MSG_GUI_BUTTON_PRESS, button, mask, x, y, pos);
}

pub fn set_gui_button_release(msg: &mut Msg, button: i32, mask: i32, x: i32, y: i32, pos: [f64; 2]) {
    set_gui_event(msg, MSG_GUI_BUTTON_RELEASE, button, mask, x, y, pos);
}

pub fn set_gui_key_press(msg: &mut Msg, key: i32, mask: i32, x: i32, y: i32, pos: [f64; 2]) {
    set_gui_event(msg, MSG_GUI_KEY_PRESS, key, mask, x, y, pos);
}

pub fn set_gui_key_release(msg: &mut Msg, key: i32, mask: i32, x: i32, y: i32, pos: [f64; 2]) {
    set_gui_event(msg, MSG_GUI_KEY_RELEASE, key, mask, x, y, pos);
}

/// Button or key event fields: `(code, mask, x, y, pos)`.
pub fn get_gui_event(msg: &Msg) -> (i32, i32, i32, i32, [f64; 2]) {
    (
        msg.arg_int(0).unwrap_or(0),
        msg.arg_int(1).unwrap_or(0),
        msg.arg_int(2).unwrap_or(0),
        msg.arg_int(3).unwrap_or(0),
        msg.arg_position(4).unwrap_or([0.0, 0.0]),
    )
}

pub fn set_gui_motion(msg: &mut Msg, mask: i32, x: i32, y: i32, pos: [f64; 2]) {
    msg.set_id(NS_GUI, MSG_GUI_MOUSE_MOTION);
    msg.set_arg_int(0, mask);
    msg.set_arg_int(1, x);
    msg.set_arg_int(2, y);
    msg.set_arg_position(3, pos);
}

pub fn set_gui_swipe(msg: &mut Msg, direction: i32) {
    msg.set_id(NS_GUI, MSG_GUI_SWIPE);
    msg.set_arg_int(0, direction);
}

/// Batch edit of a children array, delivered to subscribers.
pub fn set_splice_children(
    msg: &mut Msg,
    ns: u32,
    id: u32,
    context_id: Option<&str>,
    last: bool,
    idx: i32,
    del: i32,
    add: Value,
) {
    msg.set_id(ns, id);
    if let Some(ctx) = context_id {
        msg.set_context_id(ctx);
    }
    msg.set_last(last);
    msg.set_arg_int(0, idx);
    msg.set_arg_int(1, del);
    msg.set_arg(2, add);
}

/// Fields of a splice-children message: `(last, idx, del, add)`.
pub fn get_splice_children(msg: &Msg) -> (bool, i32, i32, Value) {
    (
        msg.get_last(),
        msg.arg_int(0).unwrap_or(0),
        msg.arg_int(1).unwrap_or(0),
        msg.arg(2).cloned().unwrap_or_default(),
    )
}

/// Apply a splice-children message to the `children` array of `dict`.
pub fn splice_children(msg: &Msg, dict: &mut Dictionary) {
    let (_, idx, del, add) = get_splice_children(msg);
    let arr = dict.get_array_create(meta::CHILDREN);
    match add {
        Value::Undefined => arr.splice_val(idx as isize, del as isize, None),
        Value::Array(mut a) => arr.splice_array(idx as isize, del as isize, &mut a),
        other => arr.splice_val(idx as isize, del as isize, Some(other)),
    }
}
