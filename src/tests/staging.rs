use super::*;
use crate::chip::{GlobalAddress, Interconnect};
use crate::error::{ChipError, ConfigError};
use crate::host::Host;
use crate::network::LayerParameters;

#[test]
fn parameter_table_holds_one_record_per_layer() {
    let host = Host::new(small_chip(2, 2)).unwrap();
    let config = *host.chip().config();
    let first = plain_layer(4, 4, 3, 4, 4, KernelSlice::uniform(2, 3, 1.0, 1.0));
    let second = plain_layer(4, 1, 1, 4, 4, KernelSlice::uniform(1, 1, 1.0, 1.0));
    let image = vec![1f32; 4 * 16];

    let staged = host.stage(&image, &[first, second]).unwrap();
    for (n, record) in staged.params.iter().enumerate() {
        let addr = GlobalAddress::Dram(config.parameter_table + n * LayerParameters::WORDS);
        let words = host.chip().read(addr, LayerParameters::WORDS).unwrap();
        assert_eq!(&LayerParameters::from_words(&words), record);
    }
    assert_eq!(staged.params[0].num_maps, 2);
    assert_eq!(staged.params[1].kernel_width, 1);
    assert!(staged.params[0].dram_kernel_ptr as usize >= config.heap_addr);
    assert_eq!(
        host.chip().read_dram_f32s(config.image_addr, image.len()).unwrap(),
        image
    );
}

#[test]
fn kernel_table_is_laid_out_in_pe_order() {
    let host = Host::new(small_chip(2, 2)).unwrap();
    let kernels = (0..4)
        .map(|pe| KernelSlice::uniform(1, 3, pe as f32, 10.0 + pe as f32))
        .collect();
    let layer = LayerSpec {
        kernels,
        ..plain_layer(4, 1, 3, 4, 2, KernelSlice::uniform(1, 3, 0.0, 0.0))
    };

    let staged = host.stage(&[0f32; 16], &[layer]).unwrap();
    let params = &staged.params[0];
    let slice_len = params.kernel_slice_len();
    let table = host
        .chip()
        .read_dram_f32s(params.dram_kernel_ptr as usize, 4 * slice_len)
        .unwrap();
    for (pe, slice) in table.chunks_exact(slice_len).enumerate() {
        assert_eq!(&slice[..9], &[pe as f32; 9]);
        assert_eq!(slice[9], 10.0 + pe as f32);
    }
}

#[test]
fn missing_kernel_slices_are_rejected() {
    let host = Host::new(small_chip(2, 2)).unwrap();
    let layer = plain_layer(3, 1, 3, 4, 2, KernelSlice::uniform(1, 3, 1.0, 1.0));
    match host.stage(&[0f32; 16], &[layer]) {
        Err(ChipError::Config(ConfigError::KernelShape { expected, actual, .. })) => {
            assert_eq!((expected, actual), (4, 3))
        }
        other => panic!("expected a kernel shape error, got {:?}", other.err()),
    }
}

#[test]
fn untileable_layer_chain_is_rejected_before_running() {
    let host = Host::new(small_chip(1, 1)).unwrap();
    // 4x4 output map cannot be cut into 3x3 patches
    let first = plain_layer(1, 4, 1, 2, 4, KernelSlice::uniform(1, 1, 1.0, 1.0));
    let second = plain_layer(1, 1, 1, 3, 3, KernelSlice::uniform(1, 1, 1.0, 1.0));
    let result = host.run(&[0f32; 16], &[first, second]);
    assert!(matches!(
        result,
        Err(ChipError::Config(ConfigError::MapNotTileable { patch_width: 3, .. }))
    ));
}

#[test]
fn image_shorter_than_its_patches_is_rejected() {
    let host = Host::new(small_chip(1, 1)).unwrap();
    // Four 2x2 patches need 16 words
    let layer = plain_layer(1, 4, 1, 2, 4, KernelSlice::uniform(1, 1, 1.0, 1.0));
    match host.stage(&[1f32; 4], &[layer]) {
        Err(ChipError::Config(ConfigError::NotEnoughPatches {
            layer,
            required,
            available,
        })) => assert_eq!((layer, required, available), (0, 4, 1)),
        other => panic!("expected a patch count error, got {:?}", other.err()),
    }
}

#[test]
fn next_layer_cannot_read_more_patches_than_the_map_holds() {
    let host = Host::new(small_chip(1, 1)).unwrap();
    // 4x4 output map holds four 2x2 patches
    let first = plain_layer(1, 4, 1, 2, 4, KernelSlice::uniform(1, 1, 1.0, 1.0));
    let second = plain_layer(1, 5, 1, 2, 4, KernelSlice::uniform(1, 1, 1.0, 1.0));
    match host.stage(&[1f32; 16], &[first, second]) {
        Err(ChipError::Config(ConfigError::NotEnoughPatches {
            layer,
            required,
            available,
        })) => assert_eq!((layer, required, available), (1, 5, 4)),
        other => panic!("expected a patch count error, got {:?}", other.err()),
    }
}

#[test]
fn restaging_clears_the_previous_output_map() {
    let host = Host::new(small_chip(1, 1)).unwrap();
    let full = plain_layer(1, 4, 1, 2, 4, KernelSlice::uniform(1, 1, 1.0, 1.0));
    let outputs = host.run(&[7f32; 16], &[full]).unwrap();
    assert_eq!(outputs[0], vec![7.0; 16]);

    // Three patches leave the last tile slot of the 4x4 map unwritten
    let partial = plain_layer(1, 3, 1, 2, 4, KernelSlice::uniform(1, 1, 1.0, 1.0));
    let outputs = host.run(&[1f32; 12], &[partial]).unwrap();
    #[rustfmt::skip]
    let expected = vec![
        1., 1., 1., 1.,
        1., 1., 1., 1.,
        1., 1., 0., 0.,
        1., 1., 0., 0.,
    ];
    assert_eq!(outputs[0], expected);
}
