#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    io,
    ops::{Deref, DerefMut},
    path::PathBuf,
    rc::Rc,
};

use drm::control::{connector, crtc, encoder, framebuffer, RawResourceHandle};
use kmsview::{
    backend::drm::{
        BufferLayout, ConnectorInfo, CrtcInfo, DisplayMode, EncoderInfo, KmsDevice, Resources,
    },
    utils::{Physical, Point, Size},
};

pub fn handle<T: From<RawResourceHandle>>(id: u32) -> T {
    drm::control::from_u32(id).unwrap()
}

pub fn conn(id: u32) -> connector::Handle {
    handle(id)
}

pub fn enc(id: u32) -> encoder::Handle {
    handle(id)
}

pub fn crtc(id: u32) -> crtc::Handle {
    handle(id)
}

pub fn fb(id: u32) -> framebuffer::Handle {
    handle(id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeMode {
    pub w: u32,
    pub h: u32,
    pub refresh: u32,
}

impl FakeMode {
    pub const fn new(w: u32, h: u32, refresh: u32) -> Self {
        FakeMode { w, h, refresh }
    }
}

impl DisplayMode for FakeMode {
    fn size(&self) -> Size<u32, Physical> {
        Size::new(self.w, self.h)
    }

    fn vrefresh(&self) -> u32 {
        self.refresh
    }
}

/// Everything the fake kernel was asked to do, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateDumbBuffer(u32),
    AddFramebuffer(framebuffer::Handle),
    Map(u32),
    SetCrtc {
        crtc: crtc::Handle,
        fb: Option<framebuffer::Handle>,
        mode: Option<FakeMode>,
    },
    Unmap(u32),
    DestroyFramebuffer(framebuffer::Handle),
    DestroyDumbBuffer(u32),
    Close,
}

impl Call {
    pub fn is_release(&self) -> bool {
        matches!(
            self,
            Call::Unmap(_) | Call::DestroyFramebuffer(_) | Call::DestroyDumbBuffer(_) | Call::Close
        )
    }
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

/// Bytes of the last mapping, captured when it is unmapped
pub type Contents = Rc<RefCell<Vec<u8>>>;

pub fn releases(log: &CallLog) -> Vec<Call> {
    log.borrow().iter().filter(|call| call.is_release()).cloned().collect()
}

/// Operations that can be made to fail
#[derive(Debug, Default, Clone, Copy)]
pub struct Failures {
    pub resources: bool,
    pub create_dumb_buffer: bool,
    pub add_framebuffer: bool,
    pub map: bool,
    pub short_mapping: bool,
    pub set_crtc: bool,
}

#[derive(Debug)]
pub struct FakeBuffer(pub u32);

#[derive(Debug)]
pub struct FakeMapping {
    id: u32,
    data: Vec<u8>,
    log: CallLog,
    contents: Contents,
}

impl Deref for FakeMapping {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for FakeMapping {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for FakeMapping {
    fn drop(&mut self) {
        self.log.borrow_mut().push(Call::Unmap(self.id));
        *self.contents.borrow_mut() = std::mem::take(&mut self.data);
    }
}

/// Scripted in-memory modesetting device
#[derive(Debug)]
pub struct FakeDevice {
    pub log: CallLog,
    pub contents: Contents,
    pub fail: Failures,
    pub connectors: Vec<ConnectorInfo<FakeMode>>,
    pub broken_connectors: Vec<connector::Handle>,
    pub encoders: RefCell<Vec<EncoderInfo>>,
    pub crtcs: Vec<CrtcInfo<FakeMode>>,
    /// Bytes appended to every row of a dumb buffer
    pub pitch_padding: u32,
    next_id: Cell<u32>,
}

pub const HDMI: u32 = 1;
pub const DP: u32 = 2;
pub const ENCODER: u32 = 10;
pub const CRTC_BOUND: u32 = 20;
pub const CRTC_SPARE: u32 = 21;
pub const CONSOLE_FB: u32 = 30;

pub const CONSOLE_MODE: FakeMode = FakeMode::new(1280, 720, 60);

impl FakeDevice {
    /// A device without any connectors, encoders or crtcs
    pub fn empty(log: CallLog) -> Self {
        FakeDevice {
            log,
            contents: Contents::default(),
            fail: Failures::default(),
            connectors: Vec::new(),
            broken_connectors: Vec::new(),
            encoders: RefCell::new(Vec::new()),
            crtcs: Vec::new(),
            pitch_padding: 0,
            next_id: Cell::new(100),
        }
    }

    /// One disconnected DP port and one HDMI monitor showing a 720p console
    pub fn single_output(log: CallLog) -> Self {
        let mut dev = FakeDevice::empty(log);
        dev.connectors.push(ConnectorInfo {
            handle: conn(DP),
            name: "DP-1".into(),
            state: connector::State::Disconnected,
            modes: Vec::new(),
            current_encoder: None,
        });
        dev.connectors.push(ConnectorInfo {
            handle: conn(HDMI),
            name: "HDMI-A-1".into(),
            state: connector::State::Connected,
            modes: vec![
                CONSOLE_MODE,
                FakeMode::new(1920, 1080, 60),
                FakeMode::new(1920, 1080, 50),
                FakeMode::new(1024, 768, 75),
            ],
            current_encoder: Some(enc(ENCODER)),
        });
        dev.encoders.get_mut().push(EncoderInfo {
            handle: enc(ENCODER),
            crtc: Some(crtc(CRTC_BOUND)),
            possible_crtcs: vec![crtc(CRTC_BOUND), crtc(CRTC_SPARE)],
        });
        dev.crtcs.push(CrtcInfo {
            handle: crtc(CRTC_BOUND),
            framebuffer: Some(fb(CONSOLE_FB)),
            position: Point::new(0, 0),
            mode: Some(CONSOLE_MODE),
        });
        dev.crtcs.push(CrtcInfo {
            handle: crtc(CRTC_SPARE),
            framebuffer: None,
            position: Point::new(0, 0),
            mode: None,
        });
        dev
    }

    /// Change the crtc bound to `encoder`
    pub fn rebind(&self, encoder: encoder::Handle, crtc: Option<crtc::Handle>) {
        for info in self.encoders.borrow_mut().iter_mut() {
            if info.handle == encoder {
                info.crtc = crtc;
            }
        }
    }

    fn id(&self) -> u32 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn failure(what: &str) -> io::Error {
        io::Error::new(io::ErrorKind::PermissionDenied, format!("{} failed", what))
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.record(Call::Close);
    }
}

impl KmsDevice for FakeDevice {
    type Mode = FakeMode;
    type Buffer = FakeBuffer;
    type Mapping = FakeMapping;

    fn dev_path(&self) -> Option<PathBuf> {
        Some(PathBuf::from("/dev/dri/card0"))
    }

    fn resources(&self) -> io::Result<Resources> {
        if self.fail.resources {
            return Err(Self::failure("resource query"));
        }
        Ok(Resources {
            connectors: self.connectors.iter().map(|info| info.handle).collect(),
            encoders: self.encoders.borrow().iter().map(|info| info.handle).collect(),
            crtcs: self.crtcs.iter().map(|info| info.handle).collect(),
        })
    }

    fn connector(&self, handle: connector::Handle) -> io::Result<ConnectorInfo<FakeMode>> {
        if self.broken_connectors.contains(&handle) {
            return Err(Self::failure("connector query"));
        }
        self.connectors
            .iter()
            .find(|info| info.handle == handle)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn encoder(&self, handle: encoder::Handle) -> io::Result<EncoderInfo> {
        self.encoders
            .borrow()
            .iter()
            .find(|info| info.handle == handle)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn crtc(&self, handle: crtc::Handle) -> io::Result<CrtcInfo<FakeMode>> {
        self.crtcs
            .iter()
            .find(|info| info.handle == handle)
            .copied()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn create_dumb_buffer(&self, size: Size<u32, Physical>, bpp: u32) -> io::Result<(FakeBuffer, BufferLayout)> {
        if self.fail.create_dumb_buffer {
            return Err(Self::failure("dumb buffer creation"));
        }
        let id = self.id();
        self.record(Call::CreateDumbBuffer(id));
        let pitch = size.w * bpp / 8 + self.pitch_padding;
        Ok((
            FakeBuffer(id),
            BufferLayout {
                size,
                pitch,
                len: pitch as usize * size.h as usize,
            },
        ))
    }

    fn add_framebuffer(&self, _buffer: &FakeBuffer, _depth: u32, _bpp: u32) -> io::Result<framebuffer::Handle> {
        if self.fail.add_framebuffer {
            return Err(Self::failure("framebuffer registration"));
        }
        let handle = fb(self.id());
        self.record(Call::AddFramebuffer(handle));
        Ok(handle)
    }

    fn map_dumb_buffer(&self, buffer: &FakeBuffer, layout: &BufferLayout) -> io::Result<FakeMapping> {
        if self.fail.map {
            return Err(Self::failure("mapping"));
        }
        self.record(Call::Map(buffer.0));
        let len = if self.fail.short_mapping {
            layout.len / 2
        } else {
            layout.len
        };
        // garbage, so clearing is observable
        Ok(FakeMapping {
            id: buffer.0,
            data: vec![0xAA; len],
            log: self.log.clone(),
            contents: self.contents.clone(),
        })
    }

    fn set_crtc(
        &self,
        crtc: crtc::Handle,
        framebuffer: Option<framebuffer::Handle>,
        _position: Point<u32, Physical>,
        _connectors: &[connector::Handle],
        mode: Option<FakeMode>,
    ) -> io::Result<()> {
        if self.fail.set_crtc {
            return Err(Self::failure("mode-set"));
        }
        self.record(Call::SetCrtc {
            crtc,
            fb: framebuffer,
            mode,
        });
        Ok(())
    }

    fn destroy_framebuffer(&self, framebuffer: framebuffer::Handle) -> io::Result<()> {
        self.record(Call::DestroyFramebuffer(framebuffer));
        Ok(())
    }

    fn destroy_dumb_buffer(&self, buffer: FakeBuffer) -> io::Result<()> {
        self.record(Call::DestroyDumbBuffer(buffer.0));
        Ok(())
    }
}
