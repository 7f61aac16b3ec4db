//! Fallible helpers around `fitsio`.

use std::{fmt::Display, path::Path, ptr};

use fitsio::{errors::check_status as fits_check_status, hdu::*, FitsFile};
use ndarray::{ArrayD, IxDyn};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FitsError {
    #[error(transparent)]
    Fitsio(#[from] fitsio::errors::Error),

    #[error("HDU {hdu_num}: keyword '{key}' doesn't exist")]
    MissingKey { key: String, hdu_num: usize },

    #[error("HDU {hdu_num}: couldn't parse keyword '{key}' (value '{value}')")]
    Parse {
        key: String,
        value: String,
        hdu_num: usize,
    },

    #[error("HDU {hdu_num} is not an image")]
    NotImage { hdu_num: usize },

    #[error("HDU {hdu_num}: {len} values can't fill an image with shape {shape:?}")]
    Shape {
        hdu_num: usize,
        len: usize,
        shape: Vec<usize>,
    },
}

/// Open a fits file. The file is closed when the returned handle is dropped.
pub(crate) fn fits_open<P: AsRef<Path>>(file: P) -> Result<FitsFile, FitsError> {
    Ok(FitsFile::open(file.as_ref())?)
}

/// Open a fits file's HDU.
pub(crate) fn fits_open_hdu<T: DescribesHdu + Display + Copy>(
    fits_fptr: &mut FitsFile,
    hdu_description: T,
) -> Result<FitsHdu, FitsError> {
    Ok(fits_fptr.hdu(hdu_description)?)
}

/// Given a FITS file pointer, a HDU that belongs to it, and a keyword that may
/// or may not exist, pull out the value of the keyword, parsing it into the
/// desired type. Blank values are treated as if the keyword doesn't exist.
pub(crate) fn fits_get_optional_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Option<T>, FitsError> {
    let unparsed_value: String = match hdu.read_key(fits_fptr, keyword) {
        Ok(key_value) => key_value,
        Err(e) => match &e {
            // 202 = KEY_NO_EXIST, 204 = VALUE_UNDEFINED
            fitsio::errors::Error::Fits(fe) if matches!(fe.status, 202 | 204) => return Ok(None),
            _ => return Err(e.into()),
        },
    };
    let unparsed_value = unparsed_value.trim();
    if unparsed_value.is_empty() {
        return Ok(None);
    }

    match unparsed_value.parse() {
        Ok(parsed_value) => Ok(Some(parsed_value)),
        Err(_) => Err(FitsError::Parse {
            key: keyword.to_string(),
            value: unparsed_value.to_string(),
            hdu_num: hdu.number,
        }),
    }
}

/// Given a FITS file pointer, a HDU that belongs to it, and a keyword, pull out
/// the value of the keyword, parsing it into the desired type.
pub(crate) fn fits_get_required_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<T, FitsError> {
    match fits_get_optional_key(fits_fptr, hdu, keyword)? {
        Some(value) => Ok(value),
        None => Err(FitsError::MissingKey {
            key: keyword.to_string(),
            hdu_num: hdu.number,
        }),
    }
}

/// Get the (row-major) shape of the image on the supplied HDU.
pub(crate) fn fits_get_image_size(hdu: &FitsHdu) -> Result<&Vec<usize>, FitsError> {
    match &hdu.info {
        HduInfo::ImageInfo { shape, .. } => Ok(shape),
        _ => Err(FitsError::NotImage {
            hdu_num: hdu.number,
        }),
    }
}

/// Given a FITS file pointer and a HDU, read the associated image with any
/// BSCALE/BZERO scaling applied.
pub(crate) fn fits_get_image(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
) -> Result<ArrayD<f64>, FitsError> {
    let shape = fits_get_image_size(hdu)?.clone();
    let data: Vec<f64> = hdu.read_image(fits_fptr)?;
    shape_image(hdu, data, shape)
}

/// Given a FITS file pointer and a HDU, read the associated image as it's
/// stored on disk, i.e. without BSCALE/BZERO applied.
pub(crate) fn fits_get_unscaled_image(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
) -> Result<ArrayD<f64>, FitsError> {
    let shape = fits_get_image_size(hdu)?.clone();
    let mut buffer = vec![0.0_f64; shape.iter().product()];
    // Scaling is set on the current HDU.
    fits_fptr.hdu(hdu.number)?;

    unsafe {
        // Get raw ptr and length to our buffer
        let buffer_len = buffer.len() as i64;
        let buffer_ptr = buffer.as_mut_ptr();

        let mut status = 0;
        // ffpscl = fits_set_bscale
        fitsio_sys::ffpscl(fits_fptr.as_raw(), 1.0, 0.0, &mut status);
        fits_check_status(status)?;

        // ffgpv = fits_read_img
        fitsio_sys::ffgpv(
            fits_fptr.as_raw(),
            fitsio_sys::TDOUBLE as _,
            1,
            buffer_len,
            ptr::null_mut(),
            buffer_ptr.cast(),
            ptr::null_mut(),
            &mut status,
        );
        fits_check_status(status)?;
    }

    shape_image(hdu, buffer, shape)
}

fn shape_image(hdu: &FitsHdu, data: Vec<f64>, shape: Vec<usize>) -> Result<ArrayD<f64>, FitsError> {
    let len = data.len();
    ArrayD::from_shape_vec(IxDyn(&shape), data).map_err(|_| FitsError::Shape {
        hdu_num: hdu.number,
        len,
        shape,
    })
}
