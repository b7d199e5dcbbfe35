use crate::define_id_type;

define_id_type!(NodeId, u32);
define_id_type!(JobId, u32);
define_id_type!(PartitionId, u32);
