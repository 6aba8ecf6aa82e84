use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusb::{Device, DeviceHandle, GlobalContext};
use std::time::Duration;
use tracing::{debug, info};

/// Teensy 2.0 HalfKay bootloader USB identifiers.
const HALFKAY_VID: u16 = 0x16C0;
const HALFKAY_PID: u16 = 0x0478;

/// Running footswitch firmware (shared V-USB keyboard PID).
const FOOTSWITCH_VID: u16 = 0x16C0;
const FOOTSWITCH_PID: u16 = 0x27DB;

/// Vendor request the firmware answers by jumping to the bootloader.
const REQUEST_TYPE_VENDOR_OUT: u8 = 0x40;
const REQUEST_BOOTLOADER: u8 = 0xFF;

/// ATmega32U4 flash page size in bytes.
const PAGE_SIZE: usize = 128;

/// Flash available to the application (32KB minus the 512 byte HalfKay block).
const FLASH_SIZE: usize = 0x7E00;

const USB_TIMEOUT: Duration = Duration::from_secs(2);

/// Delay after each page write to allow flash programming.
const PAGE_WRITE_DELAY: Duration = Duration::from_millis(5);

fn find_device(vid: u16, pid: u16) -> Result<Option<Device<GlobalContext>>> {
    let devices = rusb::devices().context("failed to enumerate USB devices")?;
    for device in devices.iter() {
        let desc = device
            .device_descriptor()
            .context("failed to read device descriptor")?;
        if desc.vendor_id() == vid && desc.product_id() == pid {
            debug!(
                bus = device.bus_number(),
                address = device.address(),
                "found {vid:04x}:{pid:04x}"
            );
            return Ok(Some(device));
        }
    }
    Ok(None)
}

/// Detect whether a Teensy in HalfKay bootloader mode is connected.
pub fn detect() -> Result<bool> {
    Ok(find_device(HALFKAY_VID, HALFKAY_PID)?.is_some())
}

/// Ask a running footswitch to jump into the bootloader.
///
/// Returns `false` if no footswitch is attached.
pub fn reboot_to_bootloader() -> Result<bool> {
    let Some(device) = find_device(FOOTSWITCH_VID, FOOTSWITCH_PID)? else {
        return Ok(false);
    };
    let handle = device
        .open()
        .context("failed to open footswitch (may need root/sudo or udev rules)")?;

    // The device drops off the bus while answering, so a failed status stage is expected
    if let Err(e) = handle.write_control(
        REQUEST_TYPE_VENDOR_OUT,
        REQUEST_BOOTLOADER,
        0,
        0,
        &[],
        USB_TIMEOUT,
    ) {
        debug!("bootloader request: {e}");
    }
    Ok(true)
}

/// Poll for the bootloader to enumerate, up to `attempts` * 100ms.
pub fn wait_for_bootloader(attempts: u32) -> Result<bool> {
    for _ in 0..attempts {
        std::thread::sleep(Duration::from_millis(100));
        if detect()? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn open_bootloader() -> Result<DeviceHandle<GlobalContext>> {
    let Some(device) = find_device(HALFKAY_VID, HALFKAY_PID)? else {
        bail!("Teensy bootloader not found. Press the reset button on the Teensy and try again.");
    };
    device
        .open()
        .context("failed to open Teensy bootloader (may need root/sudo or udev rules)")
}

/// Flash firmware data to the Teensy via HalfKay protocol.
///
/// `base_address` is the starting address of the firmware image.
/// `data` is the firmware binary, which will be split into 128-byte pages.
pub fn flash(base_address: u32, data: &[u8]) -> Result<()> {
    let end_address = base_address as usize + data.len();
    if end_address > FLASH_SIZE {
        bail!(
            "firmware too large: {} bytes at offset 0x{:04X} exceeds {} byte flash",
            data.len(),
            base_address,
            FLASH_SIZE
        );
    }

    let handle = open_bootloader()?;

    let total_pages = data.len().div_ceil(PAGE_SIZE);
    let pb = ProgressBar::new(total_pages as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} pages")
            .context("invalid progress template")?
            .progress_chars("=> "),
    );
    pb.set_message("Flashing");

    let mut written = 0usize;
    for (page_idx, chunk) in data.chunks(PAGE_SIZE).enumerate() {
        let address = base_address as usize + page_idx * PAGE_SIZE;

        // Erased flash reads 0xFF, nothing to write
        if chunk.iter().all(|&b| b == 0xFF) {
            pb.inc(1);
            continue;
        }

        // 2 bytes address (little-endian) + page data, padded with erased bytes
        let mut buf = vec![0xFFu8; 2 + PAGE_SIZE];
        buf[..2].copy_from_slice(&(address as u16).to_le_bytes());
        buf[2..2 + chunk.len()].copy_from_slice(chunk);

        write_page(&handle, &buf)
            .with_context(|| format!("failed to write page at address 0x{:04X}", address))?;
        written += 1;

        std::thread::sleep(PAGE_WRITE_DELAY);
        pb.inc(1);
    }

    pb.finish_with_message("Flashed");
    info!(written, skipped = total_pages - written, "pages programmed");

    reboot(&handle);
    println!("Teensy rebooted. Footswitch firmware should be running.");

    Ok(())
}

/// HID SET_REPORT (output, ID 0) on interface 0 carries one page.
fn write_page(handle: &DeviceHandle<GlobalContext>, buf: &[u8]) -> Result<()> {
    handle
        .write_control(0x21, 0x09, 0x0200, 0, buf, USB_TIMEOUT)
        .context("USB control transfer failed")?;
    Ok(())
}

/// A write to address 0xFFFF makes HalfKay start the application.
/// The device disconnects immediately, so errors here are expected.
fn reboot(handle: &DeviceHandle<GlobalContext>) {
    let mut buf = vec![0u8; 2 + PAGE_SIZE];
    buf[0] = 0xFF;
    buf[1] = 0xFF;
    if let Err(e) = handle.write_control(0x21, 0x09, 0x0200, 0, &buf, USB_TIMEOUT) {
        debug!("reboot request: {e}");
    }
}
