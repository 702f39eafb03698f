//! Adaptive linear prediction.
//!
//! Samples are reconstructed from residuals with an FIR predictor whose
//! coefficients adapt after every sample by the sign of the residual
//! (sign-LMS). An order of 31 selects a plain first-order integrator.

/// Order selecting the first-order integrator.
pub const INTEGRATOR_ORDER: usize = 31;

/// Sign-extends the low `bits` bits of `val`.
#[inline(always)]
pub fn sign_extend(val: i32, bits: u32) -> i32 {
    if bits >= 32 {
        return val;
    }

    let shift = 32 - bits;
    (val << shift) >> shift
}

/// Runs a first-order integrator over `buf` in place.
pub fn integrate(buf: &mut [i32], chan_bits: u32) {
    for j in 1..buf.len() {
        buf[j] = sign_extend(buf[j].wrapping_add(buf[j - 1]), chan_bits);
    }
}

/// Reconstructs `out` from the residuals in `pc`.
///
/// The predictor order is `coefs.len()`. Coefficients are adapted in place.
pub fn unpc_block(
    pc: &[i32],
    out: &mut [i32],
    coefs: &mut [i16],
    chan_bits: u32,
    den_shift: u32,
) {
    let num = pc.len().min(out.len());
    if num == 0 {
        return;
    }

    let num_active = coefs.len();

    out[0] = pc[0];

    if num_active == 0 {
        out[1..num].copy_from_slice(&pc[1..num]);
        return;
    }

    if num_active == INTEGRATOR_ORDER {
        out[1..num].copy_from_slice(&pc[1..num]);
        integrate(&mut out[..num], chan_bits);
        return;
    }

    // Warm-up
    for j in 1..=num_active.min(num - 1) {
        out[j] = sign_extend(pc[j].wrapping_add(out[j - 1]), chan_bits);
    }

    let den_half = if den_shift == 0 {
        0
    } else {
        1i32 << (den_shift - 1)
    };
    let lim = num_active + 1;

    for j in lim..num {
        let top = out[j - lim];

        let mut sum = 0i32;
        for (k, &coef) in coefs.iter().enumerate() {
            let diff = out[j - 1 - k].wrapping_sub(top);
            sum = sum.wrapping_add((coef as i32).wrapping_mul(diff));
        }

        let mut del0 = pc[j];
        let sg = del0.signum();

        let del = pc[j]
            .wrapping_add(top)
            .wrapping_add(sum.wrapping_add(den_half) >> den_shift);
        out[j] = sign_extend(del, chan_bits);

        if sg > 0 {
            for k in (0..num_active).rev() {
                let dd = top.wrapping_sub(out[j - 1 - k]);
                let sgn = dd.signum();

                let weight = (num_active - k) as i32;

                coefs[k] = coefs[k].wrapping_sub(sgn as i16);
                del0 = del0.wrapping_sub(weight.wrapping_mul(sgn.wrapping_mul(dd) >> den_shift));
                if del0 <= 0 {
                    break;
                }
            }
        } else if sg < 0 {
            for k in (0..num_active).rev() {
                let dd = top.wrapping_sub(out[j - 1 - k]);
                let sgn = dd.signum();

                let weight = (num_active - k) as i32;

                coefs[k] = coefs[k].wrapping_add(sgn as i16);
                del0 = del0.wrapping_sub(weight.wrapping_mul((-sgn).wrapping_mul(dd) >> den_shift));
                if del0 >= 0 {
                    break;
                }
            }
        }
    }
}
