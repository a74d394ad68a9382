use mixer_hal::mock::{SimDevice, SimHandle, SimLine, SimulatedMixer};
use mixer_hal::{BackendRegistry, Channel, DeviceList, LineUpdate, MixerError};

// Line 0: real mute support, line 1: volumes only, line 2: meter-style
// read-only line.
fn init_device() -> (BackendRegistry, DeviceList, SimHandle) {
    let mixer = SimulatedMixer::new(vec![SimDevice::new(
        "sim0",
        "Card",
        vec![
            SimLine::stereo("Master", 80).with_enable(),
            SimLine::stereo("PCM", 65),
            SimLine::stereo("Monitor", 30).read_only(),
        ],
    )]);
    let handle = mixer.handle();
    let mut registry = BackendRegistry::init(vec![Box::new(mixer)]);
    let mut list = registry.list_devices().unwrap();
    registry.device_init(list.get_mut(0).unwrap()).unwrap();
    (registry, list, handle)
}

#[test]
fn initial_read_pulls_backend_state() {
    let (_registry, list, _handle) = init_device();
    let dev = list.get(0).unwrap();

    let master = &dev.lines()[0];
    assert_eq!(master.max_volume(), 80);
    assert!(master.state.enabled);

    // No independent mute, so nonzero volumes read back as enabled.
    let pcm = &dev.lines()[1];
    assert_eq!(pcm.max_volume(), 65);
    assert!(pcm.state.enabled);
}

#[test]
fn unchanged_state_is_not_reported_again() {
    let (mut registry, mut list, handle) = init_device();
    let dev = list.get_mut(0).unwrap();
    dev.clear_updated();

    registry.read_device(dev, true).unwrap();
    assert!(!dev.is_updated());
    // The lines were still read, just not accepted as changes.
    assert!(handle.borrow().reads > 3);
}

#[test]
fn non_forced_read_touches_only_flagged_lines() {
    let (mut registry, mut list, handle) = init_device();
    let dev = list.get_mut(0).unwrap();
    dev.clear_updated();
    handle.borrow_mut().set_line_all(0, 1, 25);

    let before = handle.borrow().reads;
    registry.read_device(dev, false).unwrap();
    assert_eq!(handle.borrow().reads, before, "no flags, no backend I/O");
    assert!(!dev.is_updated());

    dev.lines_mut()[1].request_read();
    registry.read_device(dev, false).unwrap();
    assert_eq!(handle.borrow().reads, before + 1);
    assert_eq!(dev.lines()[1].max_volume(), 25);
    assert!(dev.is_updated());
    assert!(!dev.lines()[1].read_required());
}

#[test]
fn enable_flag_change_alone_is_a_change() {
    let (mut registry, mut list, handle) = init_device();
    let dev = list.get_mut(0).unwrap();
    dev.clear_updated();

    handle.borrow_mut().set_line_enabled(0, 0, false);
    registry.read_device(dev, true).unwrap();

    let master = &dev.lines()[0];
    assert!(!master.state.enabled);
    assert_eq!(master.max_volume(), 80, "volumes survive a mute");
    assert!(dev.is_updated());
}

#[test]
fn accepted_reads_are_marked_backend_originated() {
    let (mut registry, mut list, handle) = init_device();
    let dev = list.get_mut(0).unwrap();
    dev.clear_updated();

    handle.borrow_mut().set_line_all(0, 1, 25);
    registry.read_device(dev, true).unwrap();

    assert_eq!(dev.lines()[1].updated(), LineUpdate::Backend);
    assert_eq!(dev.lines()[0].updated(), LineUpdate::None);
}

#[test]
fn out_of_range_backend_volumes_are_clamped() {
    let (mut registry, mut list, handle) = init_device();
    let dev = list.get_mut(0).unwrap();
    dev.clear_updated();

    handle.borrow_mut().set_line_all(0, 1, 250);
    registry.read_device(dev, true).unwrap();
    assert_eq!(dev.lines()[1].max_volume(), 100);

    // The backend still holds 250; clamping must not oscillate.
    dev.clear_updated();
    registry.read_device(dev, true).unwrap();
    assert!(!dev.is_updated());
}

#[test]
fn disabling_a_line_without_mute_writes_zeroes() {
    let (mut registry, mut list, handle) = init_device();
    let dev = list.get_mut(0).unwrap();

    dev.lines_mut()[1].state.enabled = false;
    dev.lines_mut()[1].request_write();
    registry.write_device(dev, false).unwrap();

    let zeroed = handle.borrow().devices[0].lines[1]
        .volumes
        .iter()
        .all(|v| *v == 0);
    assert!(zeroed, "disable is simulated by writing zero volumes");
    // The stored levels stay, ready for re-enable.
    assert_eq!(dev.lines()[1].max_volume(), 65);

    // Reading the muted line back is not an external change.
    dev.clear_updated();
    registry.read_device(dev, true).unwrap();
    assert!(!dev.is_updated());
    assert!(!dev.lines()[1].state.enabled);
}

#[test]
fn external_volume_on_muted_line_means_unmute() {
    let (mut registry, mut list, handle) = init_device();
    let dev = list.get_mut(0).unwrap();

    dev.lines_mut()[1].state.enabled = false;
    dev.lines_mut()[1].request_write();
    registry.write_device(dev, false).unwrap();
    dev.clear_updated();

    // Another application raises the hardware volume.
    handle.borrow_mut().set_line_all(0, 1, 45);
    registry.read_device(dev, true).unwrap();

    let pcm = &dev.lines()[1];
    assert!(pcm.state.enabled);
    assert_eq!(pcm.max_volume(), 45);
    assert!(dev.is_updated());
}

#[test]
fn read_only_lines_are_never_written() {
    let (mut registry, mut list, handle) = init_device();
    let dev = list.get_mut(0).unwrap();

    registry.write_device(dev, true).unwrap();
    // Master and PCM only; the monitor line is skipped even when forced.
    assert_eq!(handle.borrow().writes, 2);
}

#[test]
fn failed_read_keeps_the_request_pending() {
    let (mut registry, mut list, handle) = init_device();
    let dev = list.get_mut(0).unwrap();

    dev.lines_mut()[1].request_read();
    handle.borrow_mut().fail_read = true;
    assert!(matches!(
        registry.read_device(dev, false),
        Err(MixerError::Backend(_))
    ));
    assert!(dev.lines()[1].read_required());

    handle.borrow_mut().fail_read = false;
    handle.borrow_mut().set_line_all(0, 1, 10);
    registry.read_device(dev, false).unwrap();
    assert!(!dev.lines()[1].read_required());
    assert_eq!(dev.lines()[1].max_volume(), 10);
}

#[test]
fn failed_write_aborts_the_pass_and_keeps_flags() {
    let (mut registry, mut list, handle) = init_device();
    let dev = list.get_mut(0).unwrap();

    dev.lines_mut()[0].request_write();
    dev.lines_mut()[1].request_write();
    handle.borrow_mut().fail_write = true;
    assert!(registry.write_device(dev, false).is_err());
    assert!(dev.lines()[0].write_required());
    assert!(dev.lines()[1].write_required());

    handle.borrow_mut().fail_write = false;
    registry.write_device(dev, false).unwrap();
    assert!(!dev.lines()[0].write_required());
    assert!(!dev.lines()[1].write_required());
}

#[test]
fn write_pushes_stored_volumes_per_channel() {
    let (mut registry, mut list, handle) = init_device();
    let dev = list.get_mut(0).unwrap();

    let line = &mut dev.lines_mut()[1];
    line.state.volumes[Channel::FrontLeft.index()] = 20;
    line.state.volumes[Channel::FrontRight.index()] = 90;
    line.request_write();
    registry.write_device(dev, false).unwrap();

    let state = handle.borrow();
    let sim = &state.devices[0].lines[1];
    assert_eq!(sim.volumes[Channel::FrontLeft.index()], 20);
    assert_eq!(sim.volumes[Channel::FrontRight.index()], 90);
}
