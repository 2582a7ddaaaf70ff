use snafu::Snafu;

use crate::primitives::Coordinate2D;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))] // disables default `Snafu` suffix
pub enum Error {
    #[snafu(display(
        "The conditions ll.x <= ur.x && ll.y <= ur.y are not met by ll:{} ur:{}",
        lower_left_coordinate,
        upper_right_coordinate
    ))]
    InvalidBoundingBox {
        lower_left_coordinate: Coordinate2D,
        upper_right_coordinate: Coordinate2D,
    },

    #[snafu(display("Unable to parse date `{}`", input))]
    DateParse {
        input: String,
    },

    #[snafu(display("File id {} is unknown to the dictionary", id))]
    UnknownFileId {
        id: u64,
    },
}
