#![cfg_attr(target_arch = "avr", no_std)]
#![cfg_attr(target_arch = "avr", no_main)]
#![cfg_attr(target_arch = "avr", feature(abi_avr_interrupt))]
#![cfg_attr(target_arch = "avr", feature(asm_experimental_arch))]

// Everything below the power-up sequence is the GPIO input matrix, per-key
// debouncing and LED status presentation layer — out of scope here (see
// `hidkey_firmware`'s crate docs). A real board brings its own collaborator
// that scans pins into a 6-key buffer and calls `keyboard.submit_report()`
// from this loop; this firmware only owns the USB side.

#[cfg(target_arch = "avr")]
mod avr_entry {
    use avr_device::atmega32u4::Peripherals;
    use hidkey_firmware::descriptors::UsbConfig;
    use hidkey_firmware::isr;

    #[panic_handler]
    fn panic(_info: &core::panic::PanicInfo) -> ! {
        loop {}
    }

    #[no_mangle]
    pub extern "C" fn main() -> ! {
        let dp = unsafe { Peripherals::steal() };

        // Reset the clock prescaler to run at the full 16 MHz crystal rate.
        dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
        dp.CPU.clkpr.write(|w| unsafe { w.bits(0) });

        avr_device::interrupt::disable();

        isr::install(dp.USB_DEVICE, UsbConfig::default_config());
        avr_device::interrupt::free(|cs| {
            let mut slot = isr::KEYBOARD.borrow(cs).borrow_mut();
            if let Some(keyboard) = slot.as_mut() {
                let (bus, _agg) = keyboard.bus_and_state();
                bus.attach(&dp.PLL);
                keyboard.mark_disconnected();
            }
        });

        unsafe {
            avr_device::interrupt::enable();
        }

        loop {
            // The input-matrix collaborator scans pins and calls
            // `isr::KEYBOARD`'s `submit_report`/`set_pressed_keys` here, in
            // a critical section, from the foreground context (spec §5).
        }
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {}
